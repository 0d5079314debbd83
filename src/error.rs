//! Board error taxonomy
//!
//! Store errors are converted here, at the boundary of each board operation.

use kanban_store::{DomainError, Table};

/// Snapshot load failed; the previous snapshot is kept
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Failed to load {table}: {source}")]
pub struct FetchError {
    pub table: Table,
    pub source: DomainError,
}

/// A drag commit was rejected; the board reloads from the store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommitError {
    /// The task was deleted by another client while it was dragged
    #[error("Task {0} no longer exists")]
    NotFound(String),
    #[error("Store rejected the move: {0}")]
    Store(DomainError),
}

impl CommitError {
    pub fn from_store(task_id: &str, err: DomainError) -> Self {
        match err {
            DomainError::NotFound(_) => CommitError::NotFound(task_id.to_string()),
            other => CommitError::Store(other),
        }
    }
}

/// Progress persistence failed; logged and never surfaced
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Failed to store project progress: {0}")]
pub struct ProgressWriteError(#[from] pub DomainError);

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] DomainError),
}

pub type BoardResult<T> = Result<T, BoardError>;
