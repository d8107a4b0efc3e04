//! Error types for the organizer ecosystem.

use thiserror::Error;

use crate::provider::LlmError;
use crate::validate::ValidationError;

/// Errors that can occur in organizer operations.
///
/// `Validation` and `Llm` are the recoverable half: callers handle them
/// locally (re-prompt the user, degrade to an apology). The remaining
/// variants are the narrow fatal set that terminates the request.
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid persisted data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for OrganizerError {
    fn from(err: rusqlite::Error) -> Self {
        OrganizerError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for OrganizerError {
    fn from(err: serde_json::Error) -> Self {
        OrganizerError::Serialization(err.to_string())
    }
}

/// Result type alias for organizer operations.
pub type OrganizerResult<T> = Result<T, OrganizerError>;
