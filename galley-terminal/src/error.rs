//! Terminal-side error types

use thiserror::Error;

/// Terminal errors
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Backend(#[from] crate::backend::BackendError),

    /// The reserved check-number range is used up; a new range must be
    /// requested online before more checks can be opened offline
    #[error("Reserved check-number range exhausted")]
    RangeExhausted,

    /// An offline mutation the projection refuses (illegal transition,
    /// operation that needs the backend or the gateway)
    #[error("{0}")]
    Rejected(String),

    #[error("Authentication failed: {0}")]
    Auth(String),
}

pub type TerminalResult<T> = Result<T, TerminalError>;
