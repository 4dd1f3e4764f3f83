pub mod job;
pub mod profile;

pub use job::{ApplicationHistory, ApplicationRecord, Job, JobId};
pub use profile::ProfileRecord;
