//! Error types for persistence and task submission.

use thiserror::Error;

/// Failures writing the task file, its timestamp sidecar, or an export.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Why an add request was turned away. A rejected request changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddRejection {
    #[error("task key must not be empty")]
    EmptyKey,

    #[error("task title must not be empty")]
    EmptyTitle,

    #[error("estimate must be a positive number of days, got {0}")]
    NonPositiveEstimate(i64),

    #[error("estimate of {0} days is out of range")]
    EstimateTooLarge(i64),
}
