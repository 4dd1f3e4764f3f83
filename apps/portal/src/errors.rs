#![allow(dead_code)]

use thiserror::Error;

/// Error taxonomy for the portal core.
///
/// Nothing here is fatal to the process: precondition and busy errors are
/// rejected before any network call, transport errors degrade the UI to an
/// empty state, and email rejections carry the server's message verbatim.
/// Every retry is user-initiated.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Rejected before any network call (empty selection, missing profile,
    /// missing email address, nothing left to apply to).
    #[error("{0}")]
    Precondition(String),

    /// The same operation is already in flight; no second request was issued.
    #[error("{0} is already in progress")]
    Busy(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The email-apply endpoint answered `success: false`. The job stays
    /// unapplied and the server message is shown to the user as-is.
    #[error("email application failed: {message}")]
    EmailRejected { message: String },
}

impl PortalError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        PortalError::Precondition(msg.into())
    }
}
