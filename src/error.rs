//! Error types for the knowledge graph pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed model output: {0}")]
    Parse(String),

    #[error("{operation} timed out after {budget_secs}s")]
    Timeout { operation: String, budget_secs: u64 },

    #[error("Unsafe query rejected: {0}")]
    SafetyViolation(String),

    #[error("Graph storage error: {0}")]
    Storage(String),

    #[error("Generation service error: {0}")]
    Generation(String),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a timeout error from the operation name and its budget.
    pub fn timeout(operation: impl Into<String>, budget: std::time::Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            budget_secs: budget.as_secs(),
        }
    }

    /// Timeouts bound how long we wait, not whether the backend would have
    /// answered; callers may retry them. Everything else is not retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

impl From<neo4rs::Error> for Error {
    fn from(err: neo4rs::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
