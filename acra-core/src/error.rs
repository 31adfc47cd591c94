//! Error types for the acra ecosystem.

use thiserror::Error;

use crate::store::EntityKind;

/// Errors raised by a calendar store or a preference store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Calendar store unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store rejected the write: {0}")]
    Rejected(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a failed reconciliation, delete or reminder operation.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Access to {0} was not granted")]
    AccessDenied(EntityKind),

    #[error("{0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("{failed} of {total} events could not be written")]
    PartialFailure { failed: usize, total: usize },

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;
