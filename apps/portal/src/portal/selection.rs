#![allow(dead_code)]

//! Selection tracking — the transient set of jobs queued for batch apply.
//!
//! Client-local and deliberately unpersisted: a reload resets it to empty.
//! Toggle order is preserved so the batch request body lists jobs in the
//! order the user picked them.

use crate::models::JobId;

#[derive(Debug, Default)]
pub struct SelectionTracker {
    ids: Vec<JobId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership for `job_id`. Toggling twice restores the original set.
    pub fn toggle(&mut self, job_id: &JobId) {
        if let Some(pos) = self.ids.iter().position(|id| id == job_id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(job_id.clone());
        }
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.ids.iter().any(|id| id == job_id)
    }

    /// Empties the set. Called after a successful batch submission.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops every id the predicate rejects. Used by reconciliation to keep
    /// the selection disjoint from the applied set.
    pub fn retain(&mut self, keep: impl FnMut(&JobId) -> bool) {
        self.ids.retain(keep);
    }

    pub fn snapshot(&self) -> Vec<JobId> {
        self.ids.clone()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
