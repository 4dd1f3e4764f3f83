//! Application dispatch — single-job (direct link or email fallback) and
//! batch submission, with a per-operation in-flight guard.
//!
//! Duplicate-apply prevention is a core guarantee here: every mutating
//! operation claims an `OpKey` before touching the network, and a second
//! dispatch for the same key is rejected with `Busy` without issuing a
//! request. Dropping the guard (including on early return or cancellation)
//! releases the key.

use tracing::{debug, info, warn};

use crate::api::EmailApplyRequest;
use crate::errors::PortalError;
use crate::models::{Job, JobId};
use crate::portal::{JobPortal, PortalState};

/// Key identifying one mutating operation for the in-flight guard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum OpKey {
    Job(JobId),
    Batch,
}

impl OpKey {
    fn describe(&self) -> String {
        match self {
            OpKey::Job(id) => format!("an application for job {id}"),
            OpKey::Batch => "a batch application".to_string(),
        }
    }
}

/// RAII release of an in-flight key.
struct FlightGuard<'a> {
    portal: &'a JobPortal,
    key: OpKey,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.portal.state().in_flight.remove(&self.key);
    }
}

/// Opens an external apply link in a new browsing context. Failure is never
/// fatal: reaching the employer's site must not depend on local plumbing, so
/// callers log and fall back to showing the URL.
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Shells out to the platform opener.
pub struct SystemLinkOpener;

impl LinkOpener for SystemLinkOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        #[cfg(target_os = "macos")]
        let program = "open";
        #[cfg(not(target_os = "macos"))]
        let program = "xdg-open";

        std::process::Command::new(program).arg(url).spawn()?;
        Ok(())
    }
}

/// Synchronous prompt for a company email address on the fallback path.
/// `None` aborts the application with no side effect; there is no automatic
/// address inference.
pub trait EmailPrompt {
    fn company_email(&self, job: &Job) -> Option<String>;
}

/// Outcome of a single-job dispatch.
#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    /// Direct path: the external link was opened. `tracked` tells whether the
    /// bookkeeping call also landed; a tracking failure is logged, not shown.
    Direct { tracked: bool, link: String },
    /// Email path: the server confirmed the application email went out.
    EmailSent { message: String },
}

/// Outcome of a batch dispatch. `applied_count` is the server's number,
/// surfaced verbatim; it may be lower than `requested` when some ids were
/// already recorded server-side.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub requested: usize,
    pub applied_count: u64,
}

impl JobPortal {
    fn claim(&self, key: OpKey) -> Result<FlightGuard<'_>, PortalError> {
        let mut state = self.state();
        if !state.in_flight.insert(key.clone()) {
            return Err(PortalError::Busy(key.describe()));
        }
        drop(state);
        Ok(FlightGuard { portal: self, key })
    }

    fn require_profile_id(state: &PortalState) -> Result<String, PortalError> {
        state.profile_id.clone().ok_or_else(|| {
            PortalError::precondition(
                "no saved profile found — save your profile in the resume analyzer first",
            )
        })
    }

    /// Marks a job applied ahead of reconciliation and drops it from the
    /// selection queue so the two sets stay disjoint.
    fn mark_applied_locally(&self, job_id: &JobId) {
        let mut state = self.state();
        state.applied.mark_pending(job_id.clone());
        let PortalState {
            selection, applied, ..
        } = &mut *state;
        selection.retain(|id| !applied.contains(id));
    }

    /// Applies to a single job. The presence of `apply_link` picks the path:
    ///
    /// - **Direct**: submit a tracking record, then open the external link in
    ///   a new browsing context whether or not tracking succeeded. The user's
    ///   real goal is the employer's site; bookkeeping never blocks it.
    /// - **Email fallback**: prompt for a company address; only an explicit
    ///   `success: true` from the server marks the job applied.
    pub async fn apply(
        &self,
        job_id: &JobId,
        prompt: &dyn EmailPrompt,
    ) -> Result<ApplyOutcome, PortalError> {
        let (profile_id, job) = {
            let state = self.state();
            if state.applied.contains(job_id) {
                return Err(PortalError::precondition(format!(
                    "already applied to job {job_id}"
                )));
            }
            let job = state
                .catalog
                .iter()
                .find(|j| &j.id == job_id)
                .cloned()
                .ok_or_else(|| {
                    PortalError::precondition(format!("job {job_id} is not in the current catalog"))
                })?;
            (Self::require_profile_id(&state)?, job)
        };

        let _guard = self.claim(OpKey::Job(job_id.clone()))?;

        match job.apply_link.clone() {
            Some(link) => self.apply_direct(&profile_id, job_id, &link).await,
            None => self.apply_via_email(&profile_id, &job, prompt).await,
        }
    }

    async fn apply_direct(
        &self,
        profile_id: &str,
        job_id: &JobId,
        link: &str,
    ) -> Result<ApplyOutcome, PortalError> {
        let tracked = match self
            .api()
            .submit_batch_apply(profile_id, std::slice::from_ref(job_id))
            .await
        {
            Ok(response) => {
                debug!(
                    "tracked direct application for job {job_id} (applied_count={})",
                    response.applied_count
                );
                true
            }
            Err(e) => {
                // Logged, not surfaced: the link still opens below.
                warn!("application tracking failed for job {job_id}: {e}");
                false
            }
        };

        if tracked {
            self.mark_applied_locally(job_id);
        }

        if let Err(e) = self.opener().open(link) {
            warn!("could not open apply link: {e}");
            info!("apply link for job {job_id}: {link}");
        }

        if tracked {
            self.resync().await;
        }

        Ok(ApplyOutcome::Direct {
            tracked,
            link: link.to_string(),
        })
    }

    async fn apply_via_email(
        &self,
        profile_id: &str,
        job: &Job,
        prompt: &dyn EmailPrompt,
    ) -> Result<ApplyOutcome, PortalError> {
        self.state().awaiting_email = Some(job.id.clone());
        let reply = prompt.company_email(job);
        self.state().awaiting_email = None;

        let company_email = match reply {
            Some(email) if !email.trim().is_empty() => email.trim().to_string(),
            _ => {
                return Err(PortalError::precondition(
                    "a company email address is required to apply to this job",
                ))
            }
        };

        let request = EmailApplyRequest {
            profile_id: profile_id.to_string(),
            job_id: job.id.clone(),
            company_email,
            job_title: job.title.clone(),
            company_name: job.company.clone(),
        };

        let response = self.api().submit_email_apply(&request).await?;

        if response.success {
            self.mark_applied_locally(&job.id);
            self.resync().await;
            Ok(ApplyOutcome::EmailSent {
                message: response.message,
            })
        } else {
            Err(PortalError::EmailRejected {
                message: response.message,
            })
        }
    }

    /// Batch-applies to the current selection. An empty selection is rejected
    /// before any network call.
    pub async fn apply_to_selected(&self) -> Result<BatchOutcome, PortalError> {
        let (profile_id, job_ids) = {
            let state = self.state();
            let job_ids = state.selection.snapshot();
            if job_ids.is_empty() {
                return Err(PortalError::precondition("select at least one job to apply"));
            }
            (Self::require_profile_id(&state)?, job_ids)
        };

        self.submit_batch(&profile_id, job_ids).await
    }

    /// Batch-applies to every catalog job not yet in the applied set. When
    /// nothing is left, reports so without a network call.
    pub async fn apply_to_all(&self) -> Result<BatchOutcome, PortalError> {
        let (profile_id, job_ids) = {
            let state = self.state();
            let job_ids = state.applied.unapplied_of(&state.catalog);
            if job_ids.is_empty() {
                return Err(PortalError::precondition(
                    "already applied to all visible jobs",
                ));
            }
            (Self::require_profile_id(&state)?, job_ids)
        };

        self.submit_batch(&profile_id, job_ids).await
    }

    async fn submit_batch(
        &self,
        profile_id: &str,
        job_ids: Vec<JobId>,
    ) -> Result<BatchOutcome, PortalError> {
        let _guard = self.claim(OpKey::Batch)?;

        let response = self.api().submit_batch_apply(profile_id, &job_ids).await?;

        {
            let mut state = self.state();
            for id in &job_ids {
                state.applied.mark_pending(id.clone());
            }
            state.selection.clear();
        }

        info!(
            "batch apply submitted: requested={} applied_count={}",
            job_ids.len(),
            response.applied_count
        );

        self.resync().await;

        Ok(BatchOutcome {
            requested: job_ids.len(),
            applied_count: response.applied_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use tokio::sync::oneshot;

    use super::*;
    use crate::api::EmailApplyResponse;
    use crate::portal::testing::{job, record, MockApi, RecordingLinkOpener, ScriptedEmailPrompt};
    use crate::portal::JobPhase;

    fn portal_with(api: Arc<MockApi>, opener: Arc<RecordingLinkOpener>) -> JobPortal {
        JobPortal::new(api, opener)
    }

    #[tokio::test]
    async fn test_direct_apply_marks_applied_clears_selection_opens_link() {
        let api = Arc::new(MockApi::new(
            vec![job(1, Some("http://x"))],
            Vec::new(),
        ));
        let opener = Arc::new(RecordingLinkOpener::default());
        let portal = portal_with(api.clone(), opener.clone());
        portal.load().await.unwrap();

        portal.toggle_selection(&JobId::from(1));
        let outcome = portal
            .apply(&JobId::from(1), &ScriptedEmailPrompt { reply: None })
            .await
            .unwrap();

        assert!(matches!(outcome, ApplyOutcome::Direct { tracked: true, .. }));
        assert!(portal.is_applied(&JobId::from(1)));
        assert_eq!(portal.selected_count(), 0);
        assert_eq!(opener.opened.lock().unwrap().as_slice(), ["http://x"]);
        assert_eq!(portal.phase_of(&JobId::from(1)), JobPhase::Applied);
    }

    #[tokio::test]
    async fn test_direct_apply_tracking_failure_still_opens_link() {
        let api = Arc::new(MockApi::new(vec![job(1, Some("http://x"))], Vec::new()));
        api.batch_fails.store(true, Ordering::SeqCst);
        let opener = Arc::new(RecordingLinkOpener::default());
        let portal = portal_with(api.clone(), opener.clone());
        portal.load().await.unwrap();

        let outcome = portal
            .apply(&JobId::from(1), &ScriptedEmailPrompt { reply: None })
            .await
            .unwrap();

        assert!(matches!(outcome, ApplyOutcome::Direct { tracked: false, .. }));
        // Bookkeeping failed, so the job is not optimistically applied...
        assert!(!portal.is_applied(&JobId::from(1)));
        // ...but the user still reached the employer's site.
        assert_eq!(opener.opened.lock().unwrap().as_slice(), ["http://x"]);
    }

    #[tokio::test]
    async fn test_email_apply_success_marks_applied() {
        let api = Arc::new(MockApi::new(vec![job(2, None)], Vec::new()));
        let opener = Arc::new(RecordingLinkOpener::default());
        let portal = portal_with(api.clone(), opener.clone());
        portal.load().await.unwrap();

        let outcome = portal
            .apply(
                &JobId::from(2),
                &ScriptedEmailPrompt {
                    reply: Some("a@b.com".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(matches!(outcome, ApplyOutcome::EmailSent { .. }));
        assert!(portal.is_applied(&JobId::from(2)));
        let calls = api.email_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].company_email, "a@b.com");
        assert_eq!(calls[0].job_title, "Job 2");
        assert_eq!(calls[0].company_name, "Acme Corp");
        assert!(opener.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_email_apply_rejection_leaves_job_unapplied() {
        let api = Arc::new(MockApi::new(vec![job(2, None)], Vec::new()));
        *api.email_response.lock().unwrap() = EmailApplyResponse {
            success: false,
            message: "bad address".to_string(),
        };
        let portal = portal_with(api.clone(), Arc::new(RecordingLinkOpener::default()));
        portal.load().await.unwrap();

        let err = portal
            .apply(
                &JobId::from(2),
                &ScriptedEmailPrompt {
                    reply: Some("a@b.com".to_string()),
                },
            )
            .await
            .unwrap_err();

        match err {
            PortalError::EmailRejected { message } => assert_eq!(message, "bad address"),
            other => panic!("expected EmailRejected, got {other:?}"),
        }
        assert!(!portal.is_applied(&JobId::from(2)));
        assert_eq!(portal.phase_of(&JobId::from(2)), JobPhase::Matched);
    }

    #[tokio::test]
    async fn test_email_apply_aborts_without_address() {
        let api = Arc::new(MockApi::new(vec![job(2, None)], Vec::new()));
        let portal = portal_with(api.clone(), Arc::new(RecordingLinkOpener::default()));
        portal.load().await.unwrap();

        let err = portal
            .apply(&JobId::from(2), &ScriptedEmailPrompt { reply: None })
            .await
            .unwrap_err();

        assert!(matches!(err, PortalError::Precondition(_)));
        assert!(api.email_calls.lock().unwrap().is_empty());
        assert!(!portal.is_applied(&JobId::from(2)));
    }

    #[tokio::test]
    async fn test_apply_to_already_applied_job_is_rejected_without_network() {
        let api = Arc::new(MockApi::new(
            vec![job(1, Some("http://x"))],
            vec![record(1)],
        ));
        let portal = portal_with(api.clone(), Arc::new(RecordingLinkOpener::default()));
        portal.load().await.unwrap();

        let err = portal
            .apply(&JobId::from(1), &ScriptedEmailPrompt { reply: None })
            .await
            .unwrap_err();

        assert!(matches!(err, PortalError::Precondition(_)));
        assert_eq!(api.batch_call_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_to_selected_with_empty_selection_makes_no_call() {
        let api = Arc::new(MockApi::new(vec![job(1, None)], Vec::new()));
        let portal = portal_with(api.clone(), Arc::new(RecordingLinkOpener::default()));
        portal.load().await.unwrap();

        let err = portal.apply_to_selected().await.unwrap_err();
        assert!(matches!(err, PortalError::Precondition(_)));
        assert_eq!(api.batch_call_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_to_selected_submits_selection_and_clears_it() {
        let api = Arc::new(MockApi::new(
            vec![job(1, None), job(2, None), job(3, None)],
            Vec::new(),
        ));
        let portal = portal_with(api.clone(), Arc::new(RecordingLinkOpener::default()));
        portal.load().await.unwrap();

        portal.toggle_selection(&JobId::from(3));
        portal.toggle_selection(&JobId::from(1));

        let outcome = portal.apply_to_selected().await.unwrap();
        assert_eq!(outcome.requested, 2);
        assert_eq!(outcome.applied_count, 2);
        assert_eq!(portal.selected_count(), 0);
        assert!(portal.is_applied(&JobId::from(3)));
        assert!(portal.is_applied(&JobId::from(1)));
        assert!(!portal.is_applied(&JobId::from(2)));

        let calls = api.batch_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec![JobId::from(3), JobId::from(1)]);
    }

    #[tokio::test]
    async fn test_apply_to_all_submits_only_unapplied_jobs() {
        let api = Arc::new(MockApi::new(
            vec![job(3, None), job(4, None)],
            vec![record(3)],
        ));
        let portal = portal_with(api.clone(), Arc::new(RecordingLinkOpener::default()));
        portal.load().await.unwrap();

        let outcome = portal.apply_to_all().await.unwrap();
        assert_eq!(outcome.requested, 1);

        let calls = api.batch_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec![JobId::from(4)]);
    }

    #[tokio::test]
    async fn test_apply_to_all_with_full_coverage_makes_no_call() {
        let api = Arc::new(MockApi::new(
            vec![job(3, None), job(4, None)],
            vec![record(3), record(4)],
        ));
        let portal = portal_with(api.clone(), Arc::new(RecordingLinkOpener::default()));
        portal.load().await.unwrap();

        let err = portal.apply_to_all().await.unwrap_err();
        assert!(matches!(err, PortalError::Precondition(_)));
        assert_eq!(api.batch_call_count(), 0);
    }

    #[tokio::test]
    async fn test_applied_count_surfaced_verbatim_when_server_dedupes() {
        // Job 3 is already recorded server-side but the client has not yet
        // reconciled, so it goes into the request and the server skips it.
        let api = Arc::new(MockApi::new(vec![job(3, None), job(4, None)], Vec::new()));
        api.history.lock().unwrap().push(record(3));
        api.history_fails.store(true, Ordering::SeqCst);
        let portal = portal_with(api.clone(), Arc::new(RecordingLinkOpener::default()));
        portal.load().await.unwrap();
        api.history_fails.store(false, Ordering::SeqCst);

        portal.toggle_selection(&JobId::from(3));
        portal.toggle_selection(&JobId::from(4));

        let outcome = portal.apply_to_selected().await.unwrap();
        assert_eq!(outcome.requested, 2);
        assert_eq!(outcome.applied_count, 1);
    }

    #[tokio::test]
    async fn test_second_batch_while_first_in_flight_is_rejected() {
        let api = Arc::new(MockApi::new(vec![job(1, None), job(2, None)], Vec::new()));
        let portal = portal_with(api.clone(), Arc::new(RecordingLinkOpener::default()));
        portal.load().await.unwrap();

        portal.toggle_selection(&JobId::from(1));
        portal.toggle_selection(&JobId::from(2));

        let (release, gate) = oneshot::channel();
        *api.batch_gate.lock().unwrap() = Some(gate);

        let first = portal.apply_to_selected();
        let second = async {
            tokio::task::yield_now().await;
            let result = portal.apply_to_all().await;
            release.send(()).unwrap();
            result
        };

        let (first_result, second_result) = tokio::join!(first, second);
        assert!(first_result.is_ok());
        assert!(matches!(second_result, Err(PortalError::Busy(_))));
        assert_eq!(api.batch_call_count(), 1);
    }

    #[tokio::test]
    async fn test_rapid_double_apply_for_same_job_is_rejected() {
        let api = Arc::new(MockApi::new(vec![job(1, Some("http://x"))], Vec::new()));
        let opener = Arc::new(RecordingLinkOpener::default());
        let portal = portal_with(api.clone(), opener.clone());
        portal.load().await.unwrap();

        let (release, gate) = oneshot::channel();
        *api.batch_gate.lock().unwrap() = Some(gate);

        let prompt = ScriptedEmailPrompt { reply: None };
        let job_id = JobId::from(1);
        let first = portal.apply(&job_id, &prompt);
        let second = async {
            tokio::task::yield_now().await;
            let result = portal.apply(&job_id, &prompt).await;
            release.send(()).unwrap();
            result
        };

        let (first_result, second_result) = tokio::join!(first, second);
        assert!(first_result.is_ok());
        assert!(matches!(second_result, Err(PortalError::Busy(_))));
        // One tracking call, one opened link.
        assert_eq!(api.batch_call_count(), 1);
        assert_eq!(opener.opened.lock().unwrap().len(), 1);
    }
}
