use thiserror::Error;

/// Common application errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Desktop action failed: {0}")]
    Desktop(String),
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

/// A lifecycle event whose payload cannot be turned into a node.
///
/// These point at a bug in the event producer, so they are surfaced to the
/// caller instead of being dropped like stale or duplicate events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("Missing request id")]
    MissingId,

    #[error("Missing URL for request {0}")]
    MissingUrl(String),

    #[error("Invalid URL for request {id}: {reason}")]
    InvalidUrl { id: String, reason: String },

    #[error("Missing HTTP method for request {0}")]
    MissingMethod(String),

    #[error("Progress for request {id} reports {received} of {total} bytes")]
    InvalidProgress { id: String, received: i64, total: i64 },

    #[error("SSL error report for request {0} carries no errors")]
    EmptySslErrors(String),
}
