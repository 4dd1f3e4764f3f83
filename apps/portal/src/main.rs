mod api;
mod config;
mod errors;
mod models;
mod portal;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::ApiClient;
use crate::config::Config;
use crate::models::{Job, JobId};
use crate::portal::dispatch::{ApplyOutcome, EmailPrompt, SystemLinkOpener};
use crate::portal::{JobPhase, JobPortal};

/// Reads a company email address from the terminal. Blank input cancels the
/// application, matching the email-fallback contract.
struct StdinEmailPrompt;

impl EmailPrompt for StdinEmailPrompt {
    fn company_email(&self, job: &Job) -> Option<String> {
        print!(
            "Company email for \"{}\" at {} (blank to cancel): ",
            job.title, job.company
        );
        io::stdout().flush().ok();

        let mut line = String::new();
        io::stdin().read_line(&mut line).ok()?;
        let line = line.trim();
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting portal client v{}", env!("CARGO_PKG_VERSION"));

    let api = Arc::new(ApiClient::new(
        &config.api_base_url,
        config.auth_token.clone(),
        config.http_timeout_secs,
    ));
    let portal = JobPortal::new(api, Arc::new(SystemLinkOpener));

    match portal.load().await {
        Ok(count) => println!("Loaded {count} matched jobs."),
        Err(e) => println!("Could not load your matches: {e}"),
    }

    print_jobs(&portal);
    print_help();

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };

        match command {
            "list" => print_jobs(&portal),
            "select" => {
                if let Some(job_id) = resolve_job(&portal, parts.next()) {
                    portal.toggle_selection(&job_id);
                    println!("{} job(s) selected.", portal.selected_count());
                }
            }
            "apply" => {
                if let Some(job_id) = resolve_job(&portal, parts.next()) {
                    match portal.apply(&job_id, &StdinEmailPrompt).await {
                        Ok(ApplyOutcome::Direct { tracked, link }) => {
                            println!("Opened {link} in your browser.");
                            if !tracked {
                                // Tracking is bookkeeping; the application
                                // itself happens on the employer's site.
                                info!("application tracking was skipped for job {job_id}");
                            }
                        }
                        Ok(ApplyOutcome::EmailSent { message }) => {
                            println!("Application email sent: {message}");
                        }
                        Err(e) => println!("{e}"),
                    }
                }
            }
            "selected" => match portal.apply_to_selected().await {
                Ok(outcome) => println!(
                    "Successfully applied to {} of {} selected jobs!",
                    outcome.applied_count, outcome.requested
                ),
                Err(e) => println!("{e}"),
            },
            "all" => match portal.apply_to_all().await {
                Ok(outcome) => println!(
                    "Successfully applied to {} new jobs!",
                    outcome.applied_count
                ),
                Err(e) => println!("{e}"),
            },
            "refresh" => match portal.refresh().await {
                Ok(count) => {
                    println!("Refreshed: {count} matched jobs.");
                    print_jobs(&portal);
                }
                Err(e) => println!("{e}"),
            },
            "history" => print_history(&portal),
            "help" => print_help(),
            "quit" | "exit" => break,
            other => println!("Unknown command '{other}' — try 'help'."),
        }
    }

    Ok(())
}

/// Resolves a 1-based catalog index from the command line into a job id.
fn resolve_job(portal: &JobPortal, arg: Option<&str>) -> Option<JobId> {
    let views = portal.jobs();
    let index: usize = match arg.and_then(|a| a.parse().ok()) {
        Some(n) if (1..=views.len()).contains(&n) => n,
        _ => {
            println!("Give a job number between 1 and {}.", views.len());
            return None;
        }
    };
    Some(views[index - 1].job.id.clone())
}

fn print_jobs(portal: &JobPortal) {
    let views = portal.jobs();
    if views.is_empty() {
        println!("No jobs found. Make sure your profile has skills selected, then 'refresh'.");
        return;
    }

    println!("\n{} matches:", views.len());
    for (i, view) in views.iter().enumerate() {
        let badge = match view.phase {
            JobPhase::Applied => " [APPLIED]",
            JobPhase::Selected => " [SELECTED]",
            JobPhase::Applying => " [APPLYING…]",
            JobPhase::AwaitingEmailEntry => " [AWAITING EMAIL]",
            JobPhase::Matched => "",
        };
        let job = &view.job;
        print!("{:>3}. {} — {} ({})", i + 1, job.title, job.company, job.location());
        if job.match_percentage > 0 {
            print!("  {}% match", job.match_percentage);
        }
        if !job.salary.is_empty() {
            print!("  {}", job.salary);
        }
        println!("{badge}");
        if !job.matching_skills.is_empty() {
            println!("     matched skills: {}", job.matching_skills.join(", "));
        }
    }
    if portal.history_stale() {
        println!("(application history may be out of date — last fetch failed)");
    }
    println!();
}

fn print_history(portal: &JobPortal) {
    let history = portal.history();
    if history.is_empty() {
        println!("No applications recorded yet.");
    } else {
        for record in &history {
            let when = record
                .applied_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("job {} — {} ({when})", record.job_id, record.status);
        }
    }
    if portal.history_stale() {
        println!("(history may be out of date — last fetch failed)");
    }
}

fn print_help() {
    println!(
        "Commands:\n  \
         list            show matched jobs\n  \
         select <n>      toggle a job in the batch selection\n  \
         apply <n>       apply to one job (direct link or email fallback)\n  \
         selected        apply to all selected jobs\n  \
         all             apply to every job not yet applied to\n  \
         refresh         re-fetch matched jobs\n  \
         history         show application history\n  \
         quit            exit"
    );
}
