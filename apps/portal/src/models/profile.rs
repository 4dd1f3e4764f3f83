#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// The saved profile returned by `profile/me`.
///
/// The server may expose the identifier as `_id` (Mongo-style) or `id`;
/// `profile_id()` prefers `_id`, matching what the service actually sends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(default, rename = "_id")]
    mongo_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ProfileRecord {
    pub fn with_id(id: impl Into<String>) -> Self {
        ProfileRecord {
            mongo_id: None,
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn profile_id(&self) -> Option<&str> {
        self.mongo_id.as_deref().or(self.id.as_deref())
    }
}
