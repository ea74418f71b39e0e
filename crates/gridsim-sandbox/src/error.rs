//! Sandbox error types.

use thiserror::Error;

/// Result type alias for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Errors that can occur during sandbox operations.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("node already exists: {0}")]
    DuplicateNode(String),

    #[error("pod already exists: {0}")]
    DuplicatePod(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("pod not found: {0}")]
    PodNotFound(String),

    #[error("unknown machine type: {0}")]
    UnknownMachineType(String),
}
