//! Analysis errors
//!
//! One enum per collaborator plus `AnalysisError`, which wraps them with
//! the URL being analyzed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::threat::SignalError;

/// Network/HTTP failure reaching a URL
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
    #[error("http client error: {0}")]
    Client(String),
}

/// Signal computation failed on otherwise-fetched content
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("malformed content: {0}")]
    Malformed(String),
}

/// Storage collaborator failure. Logged, never propagated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("payload serialization failed: {0}")]
    Serialize(String),
}

/// Failure of one URL's analysis
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("fetch failed for {url}: {source}")]
    Fetch { url: String, source: FetchError },
    #[error("signal extraction failed for {url}: {source}")]
    Extraction { url: String, source: ExtractionError },
    #[error("analysis of {url} timed out after {budget:?}")]
    Timeout { url: String, budget: Duration },
    #[error("malformed signals for {url}: {source}")]
    Fusion { url: String, source: SignalError },
}

impl AnalysisError {
    pub fn url(&self) -> &str {
        match self {
            AnalysisError::Fetch { url, .. }
            | AnalysisError::Extraction { url, .. }
            | AnalysisError::Timeout { url, .. }
            | AnalysisError::Fusion { url, .. } => url,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Fetch { .. } => ErrorKind::Fetch,
            AnalysisError::Extraction { .. } => ErrorKind::Extraction,
            AnalysisError::Timeout { .. } => ErrorKind::Timeout,
            AnalysisError::Fusion { .. } => ErrorKind::Fusion,
        }
    }
}

/// Error category stored in a job's per-URL result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Fetch,
    Extraction,
    Timeout,
    Fusion,
    /// Worker task ended without reporting (panic or cancellation)
    Aborted,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Fetch => "fetch",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Fusion => "fusion",
            ErrorKind::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
