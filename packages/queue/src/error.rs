// ABOUTME: Error types for queue operations
// ABOUTME: Covers filesystem I/O, record parsing, and lookup failures

use thiserror::Error;

/// Main error type for queue operations
#[derive(Error, Debug)]
pub enum QueueError {
    /// Filesystem I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record failed to serialize or deserialize
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Task record does not exist
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Worker name would escape the queue tree
    #[error("Invalid worker name: {0:?}")]
    InvalidWorker(String),
}

/// Type alias for Results that return QueueError
pub type Result<T> = std::result::Result<T, QueueError>;
