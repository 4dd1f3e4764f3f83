//! Reconciliation between optimistic local state and the authoritative
//! server-side application history.
//!
//! Runs strictly after the triggering apply call's response (plain sequential
//! await), never concurrently with it, so it can never observe a history
//! snapshot older than the record it just submitted.

use tracing::debug;

use crate::api::HistoryFetch;
use crate::portal::{JobPortal, PortalState};

impl JobPortal {
    /// Re-fetches application history and re-derives the applied set as the
    /// union of history ids and still-pending optimistic marks.
    ///
    /// Merging is union-only: an optimistic mark absent from history is NOT
    /// rolled back (applying is monotone; there is no "undo apply"). A failed
    /// fetch keeps the cached history and flags it stale instead of being
    /// mistaken for an empty history.
    pub async fn resync(&self) {
        match self.api().fetch_history().await {
            HistoryFetch::Loaded(history) => {
                let mut state = self.state();
                state
                    .applied
                    .merge_history(history.applications.iter().map(|r| r.job_id.clone()));

                // Applied jobs can no longer sit in the selection queue.
                let PortalState {
                    selection, applied, ..
                } = &mut *state;
                selection.retain(|id| !applied.contains(id));

                state.history = history.applications;
                state.history_stale = false;
                debug!(
                    "reconciled: {} history records, applied set size {}",
                    state.history.len(),
                    state.applied.len()
                );
            }
            HistoryFetch::Failed => {
                self.state().history_stale = true;
            }
        }
    }
}
