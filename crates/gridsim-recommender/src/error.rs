//! Recommender error types.

use thiserror::Error;

/// Result type alias for recommender operations.
pub type RecommenderResult<T> = Result<T, RecommenderError>;

/// Errors that can occur while producing a recommendation.
#[derive(Debug, Error)]
pub enum RecommenderError {
    #[error("sandbox error: {0}")]
    Sandbox(#[from] gridsim_sandbox::SandboxError),

    #[error("machine type not in catalog: {0}")]
    UnknownMachineType(String),

    #[error("machine catalog is empty")]
    EmptyCatalog,

    #[error("all trials failed: {0}")]
    AllTrialsFailed(String),

    #[error("run cancelled")]
    Cancelled,
}
