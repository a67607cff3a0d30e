// ABOUTME: Error types for sandboxed execution
// ABOUTME: Separates validation, timeout, and infrastructure failures for retry policy

use thiserror::Error;

/// Main error type for sandbox operations
#[derive(Error, Debug)]
pub enum SandboxError {
    /// Malformed or disallowed request; surfaced in the result, never retried
    #[error("Invalid sandbox request: {0}")]
    Validation(String),

    /// Execution exceeded its wall-clock budget
    #[error("Execution timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Docker/container-related errors
    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    /// Container failed to start
    #[error("Container failed to start: {0}")]
    ContainerStartFailed(String),

    /// Docker image not found locally
    #[error("Docker image error: {0}")]
    ImageError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Queue storage error
    #[error("Storage error: {0}")]
    Storage(#[from] corral_queue::QueueError),
}

impl SandboxError {
    /// Whether this failure is the host's fault rather than the request's
    ///
    /// Infrastructure failures leave the request unprocessed for a retry on
    /// the next scan; validation and timeout outcomes are written into the
    /// result instead.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(
            self,
            SandboxError::Validation(_) | SandboxError::Timeout { .. }
        )
    }
}

/// Type alias for Results that return SandboxError
pub type Result<T> = std::result::Result<T, SandboxError>;
