use inkmark_core::{ExportError, StoreError};
use thiserror::Error;

/// Errors from the draft persistence boundary.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("draft not found: {0}")]
    DraftNotFound(String),

    #[error("failed to serialize draft annotations: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure (lock poisoned, storage unavailable).
    #[error("draft backend error: {0}")]
    Backend(String),
}

/// Umbrella error for editing-session operations, wrapping whichever layer
/// actually failed.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Export(#[from] ExportError),

    /// The background export task was cancelled or panicked.
    #[error("export task failed: {0}")]
    TaskFailed(String),
}
