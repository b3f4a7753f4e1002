//! Error types shared by the storage tier, the ingestion pipeline and the
//! index lifecycle.
//!
//! Two storage outcomes carry meaning beyond "failure":
//! - `NotFound` on a delete is treated as success by callers (idempotent delete).
//! - `AlreadyExists` on index creation is how the rebuild latch reports contention.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl StorageError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StorageError::AlreadyExists(_))
    }
}

/// Maps `NotFound` to success; every other error is passed through.
pub fn ignore_not_found(result: Result<(), StorageError>) -> Result<(), StorageError> {
    match result {
        Err(err) if err.is_not_found() => Ok(()),
        other => other,
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The archive could not be decompressed or demultiplexed. Fatal for the request.
    #[error("malformed archive: {0}")]
    MalformedArchive(#[source] std::io::Error),

    /// Listing or deleting stale content failed after ingestion.
    #[error("reconciliation failed: {0}")]
    Reconciliation(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}
