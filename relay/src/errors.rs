use thiserror::Error;

use crate::request::ValidationError;

/// Result type alias for relay operations
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// A publish attempt the broker did not accept.
///
/// Always recovered locally: the fan-out converts it into a failed delivery
/// outcome and moves on to the next routing key.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),

    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Failure while recording the delivery audit trail.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("audit store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced at the orchestration boundary.
///
/// Only these ever reach the caller, and only ever inside a failure
/// envelope; publish and audit failures are absorbed into outcome data
/// before they get here.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("broker connection error: {0}")]
    Broker(#[from] lapin::Error),

    #[error("audit store connection error: {0}")]
    Audit(#[from] AuditError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Error class name used in the failure envelope.
    pub fn class(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => "ValidationError",
            RelayError::MalformedBody(_) => "MalformedBodyError",
            RelayError::RequestBody(_) => "RequestBodyError",
            RelayError::Broker(_) => "BrokerError",
            RelayError::Audit(_) => "AuditError",
            RelayError::Io(_) => "IoError",
        }
    }
}

/// Render an error and its source chain as a multi-line diagnostic, the
/// closest analog of a stack trace that is safe to log and store.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    use std::fmt::Write;

    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(rendered, "\n  caused by: {cause}");
        source = cause.source();
    }
    rendered
}
