/// Error taxonomy for sync operations
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Snapshot key \"{0}\" not found")]
    NotFound(String),

    #[error("Host API failure: {0}")]
    Host(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("No auto-save is pending")]
    NoAutoSavePending,

    #[error("Operation was cancelled before it settled")]
    Cancelled,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
