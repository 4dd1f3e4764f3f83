#![allow(dead_code)]

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned job identifier.
///
/// The backend passes job-board identifiers through untouched and accepts
/// either integers or strings, so the client must round-trip both shapes
/// without normalizing them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobId {
    Int(i64),
    Str(String),
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobId::Int(n) => write!(f, "{n}"),
            JobId::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for JobId {
    fn from(n: i64) -> Self {
        JobId::Int(n)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId::Str(s.to_string())
    }
}

/// A matched job as returned by `jobs/matched/{profile_id}`.
///
/// Immutable from the client's point of view; the ephemeral selected/applied
/// flags are joined on by id, never stored on the record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Display string computed server-side ("$90,000 - $120,000", "Not specified").
    #[serde(default)]
    pub salary: String,
    #[serde(default)]
    pub posted_date: Option<DateTime<Utc>>,
    /// 0–100; 0 also covers "no score computed". Consumed as given.
    #[serde(default)]
    pub match_percentage: u8,
    #[serde(default)]
    pub matching_skills: Vec<String>,
    /// Presence selects the direct-apply path; absence falls back to email.
    #[serde(default)]
    pub apply_link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub contract_type: Option<String>,
}

impl Job {
    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or("Remote")
    }
}

/// One server-persisted application. Append-only; the server is the sole
/// writer of historical truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub job_id: JobId,
    #[serde(default)]
    pub status: String,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Response body of `apply/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationHistory {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub total_applications: u64,
    #[serde(default)]
    pub applications: Vec<ApplicationRecord>,
}
