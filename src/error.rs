//! Error taxonomy shared by every probe.
//!
//! Errors never cross a probe boundary as panics or process failures: each
//! probe either degrades to a fallback or attaches the error to what it
//! publishes.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for polling operations.
pub type PollResult<T> = Result<T, PollError>;

/// Failure classes for external queries.
///
/// Causes are carried as text so the error can be cloned into published
/// reports and compared in tests. Serialized as `{"kind": ..., "detail": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum PollError {
    /// The caller asked for something that cannot be queried (empty city, bad coordinate).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The source answered with nothing usable.
    #[error("no data returned")]
    NoData,

    /// The HTTP provider answered with a non-success status.
    #[error("HTTP status {code}: {}", .message.as_deref().unwrap_or("no message"))]
    HttpStatus {
        /// HTTP status code
        code: u16,
        /// Provider supplied message, when the body carried one
        message: Option<String>,
    },

    /// Transport failure: process could not start, timed out, or the request never completed.
    #[error("network error: {0}")]
    Network(String),

    /// The payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The OS refused automation access to the target application.
    #[error("automation permission denied")]
    PermissionDenied,

    /// Shutdown interrupted the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl PollError {
    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PollError::Network(_))
    }
}

impl From<serde_json::Error> for PollError {
    fn from(err: serde_json::Error) -> Self {
        PollError::Decode(err.to_string())
    }
}
