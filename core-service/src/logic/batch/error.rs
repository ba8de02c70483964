//! Batch errors

use thiserror::Error;

use super::types::JobId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("batch contains no URLs")]
    EmptyBatch,

    #[error("batch of {size} URLs exceeds the limit of {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("concurrency limit must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("invalid callback url: {0}")]
    InvalidCallbackUrl(String),

    #[error("job already exists: {0}")]
    DuplicateJob(JobId),
}
