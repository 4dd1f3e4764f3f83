#![allow(dead_code)]

//! The derived applied set: server-confirmed ids unioned with optimistic
//! marks from this session.
//!
//! Membership is monotone within a session. Reconciliation merges by union
//! and promotes pending marks once history confirms them; nothing is ever
//! removed, so a previously-applied job can never flicker back to unapplied.

use std::collections::HashSet;

use crate::models::{Job, JobId};

#[derive(Debug, Default)]
pub struct AppliedSet {
    /// Ids seen in the authoritative server history.
    confirmed: HashSet<JobId>,
    /// Ids optimistically marked applied this session, not yet seen in history.
    pending: HashSet<JobId>,
}

impl AppliedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.confirmed.contains(job_id) || self.pending.contains(job_id)
    }

    /// Optimistically marks a job applied before the next reconciliation.
    pub fn mark_pending(&mut self, job_id: JobId) {
        if !self.confirmed.contains(&job_id) {
            self.pending.insert(job_id);
        }
    }

    /// Unions history ids into the confirmed set, promoting pending marks the
    /// server has since recorded. Never removes a member.
    pub fn merge_history<I: IntoIterator<Item = JobId>>(&mut self, ids: I) {
        for id in ids {
            self.pending.remove(&id);
            self.confirmed.insert(id);
        }
    }

    /// The not-yet-applied complement within `catalog`, in catalog order.
    pub fn unapplied_of(&self, catalog: &[Job]) -> Vec<JobId> {
        catalog
            .iter()
            .filter(|job| !self.contains(&job.id))
            .map(|job| job.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.confirmed.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty() && self.pending.is_empty()
    }

    #[cfg(test)]
    pub fn ids(&self) -> HashSet<JobId> {
        self.confirmed.union(&self.pending).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: i64) -> Job {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("Job {id}"),
            "company": "Acme",
            "location": null,
            "posted_date": null,
            "apply_link": null
        }))
        .unwrap()
    }

    #[test]
    fn test_pending_mark_counts_as_applied() {
        let mut applied = AppliedSet::new();
        applied.mark_pending(JobId::from(1));
        assert!(applied.contains(&JobId::from(1)));
    }

    #[test]
    fn test_merge_promotes_pending_without_double_count() {
        let mut applied = AppliedSet::new();
        applied.mark_pending(JobId::from(1));
        applied.merge_history(vec![JobId::from(1), JobId::from(2)]);

        assert_eq!(applied.len(), 2);
        assert!(applied.contains(&JobId::from(1)));
        assert!(applied.contains(&JobId::from(2)));
    }

    #[test]
    fn test_membership_is_monotone_across_merges() {
        let mut applied = AppliedSet::new();
        applied.mark_pending(JobId::from(1));
        applied.merge_history(vec![JobId::from(2)]);

        let before = applied.ids();
        // A later, shorter history snapshot must not shrink the set.
        applied.merge_history(Vec::new());
        assert!(before.is_subset(&applied.ids()));
        assert!(applied.contains(&JobId::from(1)));
    }

    #[test]
    fn test_mark_pending_on_confirmed_id_is_noop() {
        let mut applied = AppliedSet::new();
        applied.merge_history(vec![JobId::from(5)]);
        applied.mark_pending(JobId::from(5));
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn test_unapplied_complement_keeps_catalog_order() {
        let catalog = vec![job(3), job(4), job(5)];
        let mut applied = AppliedSet::new();
        applied.merge_history(vec![JobId::from(4)]);

        assert_eq!(
            applied.unapplied_of(&catalog),
            vec![JobId::from(3), JobId::from(5)]
        );
    }
}
