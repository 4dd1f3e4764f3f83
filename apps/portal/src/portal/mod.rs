#![allow(dead_code)]

//! The job portal core: catalog loading, selection tracking, application
//! dispatch, and reconciliation against the server-side application history.
//!
//! All state lives behind one mutex that is never held across an await, so a
//! shared `Arc<JobPortal>` can be driven from the UI event loop while the
//! per-operation in-flight guard keeps duplicate submissions out at the core
//! level rather than relying on disabled buttons.

pub mod applied;
pub mod dispatch;
pub mod selection;
pub mod sync;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::api::JobsApi;
use crate::errors::PortalError;
use crate::models::{ApplicationRecord, Job, JobId};

use applied::AppliedSet;
use dispatch::{LinkOpener, OpKey};
use selection::SelectionTracker;

/// Client-observed lifecycle of a single job. `Applied` is terminal for the
/// session; nothing transitions out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Matched,
    Selected,
    Applying,
    AwaitingEmailEntry,
    Applied,
}

/// A catalog entry joined with its ephemeral phase, ready for rendering.
#[derive(Debug, Clone)]
pub struct JobView {
    pub job: Job,
    pub phase: JobPhase,
}

pub struct JobPortal {
    api: Arc<dyn JobsApi>,
    opener: Arc<dyn LinkOpener>,
    state: Mutex<PortalState>,
}

#[derive(Default)]
pub(crate) struct PortalState {
    pub(crate) profile_id: Option<String>,
    pub(crate) catalog: Vec<Job>,
    pub(crate) selection: SelectionTracker,
    pub(crate) applied: AppliedSet,
    pub(crate) in_flight: HashSet<OpKey>,
    pub(crate) awaiting_email: Option<JobId>,
    pub(crate) history: Vec<ApplicationRecord>,
    pub(crate) history_stale: bool,
}

impl PortalState {
    fn phase(&self, job_id: &JobId) -> JobPhase {
        if self.applied.contains(job_id) {
            JobPhase::Applied
        } else if self.awaiting_email.as_ref() == Some(job_id) {
            JobPhase::AwaitingEmailEntry
        } else if self.in_flight.contains(&OpKey::Job(job_id.clone())) {
            JobPhase::Applying
        } else if self.selection.contains(job_id) {
            JobPhase::Selected
        } else {
            JobPhase::Matched
        }
    }
}

impl JobPortal {
    pub fn new(api: Arc<dyn JobsApi>, opener: Arc<dyn LinkOpener>) -> Self {
        Self {
            api,
            opener,
            state: Mutex::new(PortalState::default()),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, PortalState> {
        self.state.lock().expect("portal state lock poisoned")
    }

    pub(crate) fn api(&self) -> &dyn JobsApi {
        self.api.as_ref()
    }

    pub(crate) fn opener(&self) -> &dyn LinkOpener {
        self.opener.as_ref()
    }

    /// Initial load: resolve the saved profile, fetch the matched catalog,
    /// then reconcile against server history once.
    ///
    /// A missing saved profile is a precondition failure, not a network
    /// error; the caller tells the user to save one first.
    pub async fn load(&self) -> Result<usize, PortalError> {
        let profile = self.api.fetch_profile().await?;
        let profile_id = profile
            .profile_id()
            .ok_or_else(|| {
                PortalError::precondition(
                    "no saved profile found — save your profile in the resume analyzer first",
                )
            })?
            .to_string();

        self.state().profile_id = Some(profile_id.clone());

        let count = self.fetch_catalog(&profile_id).await;
        self.resync().await;
        Ok(count)
    }

    /// User-triggered catalog re-fetch (the REFRESH action).
    pub async fn refresh(&self) -> Result<usize, PortalError> {
        let profile_id = self.profile_id().ok_or_else(|| {
            PortalError::precondition(
                "no saved profile found — save your profile in the resume analyzer first",
            )
        })?;
        Ok(self.fetch_catalog(&profile_id).await)
    }

    /// Fetches the catalog, degrading to empty on failure. The UI renders
    /// "no jobs found" with a retry action; there is no built-in retry loop.
    async fn fetch_catalog(&self, profile_id: &str) -> usize {
        match self.api.fetch_matched_jobs(profile_id).await {
            Ok(jobs) => {
                let count = jobs.len();
                self.state().catalog = jobs;
                count
            }
            Err(e) => {
                warn!("matched jobs fetch failed: {e}");
                self.state().catalog = Vec::new();
                0
            }
        }
    }

    /// Flips selection for a job. Selection is only meaningful for
    /// not-yet-applied jobs, so applied or in-flight ids are ignored.
    pub fn toggle_selection(&self, job_id: &JobId) {
        let mut state = self.state();
        if state.applied.contains(job_id) {
            debug!("ignoring selection toggle for already-applied job {job_id}");
            return;
        }
        if state.in_flight.contains(&OpKey::Job(job_id.clone())) {
            debug!("ignoring selection toggle for in-flight job {job_id}");
            return;
        }
        state.selection.toggle(job_id);
    }

    pub fn jobs(&self) -> Vec<JobView> {
        let state = self.state();
        state
            .catalog
            .iter()
            .map(|job| JobView {
                job: job.clone(),
                phase: state.phase(&job.id),
            })
            .collect()
    }

    pub fn phase_of(&self, job_id: &JobId) -> JobPhase {
        self.state().phase(job_id)
    }

    pub fn is_applied(&self, job_id: &JobId) -> bool {
        self.state().applied.contains(job_id)
    }

    pub fn selected_count(&self) -> usize {
        self.state().selection.len()
    }

    pub fn history(&self) -> Vec<ApplicationRecord> {
        self.state().history.clone()
    }

    /// True when the last history fetch failed and the cached history may be
    /// behind server truth.
    pub fn history_stale(&self) -> bool {
        self.state().history_stale
    }

    pub fn profile_id(&self) -> Option<String> {
        self.state().profile_id.clone()
    }
}
