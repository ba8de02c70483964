//! Collaborator interfaces
//!
//! The crawler, the feature extractor and the artifact store sit outside
//! the analysis core. The worker only talks to them through these traits.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::{ExtractionError, FetchError, StoreError};
use crate::logic::threat::SignalSet;

// ============================================================================
// FETCH
// ============================================================================

/// Raw page content as returned by the crawler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub content_sha256: String,
    pub fetched_at: DateTime<Utc>,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, status_code: u16, headers: HashMap<String, String>, body: String) -> Self {
        let content_sha256 = hex::encode(Sha256::digest(body.as_bytes()));
        Self {
            url: url.into(),
            status_code,
            headers,
            body,
            content_sha256,
            fetched_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

// ============================================================================
// EXTRACT
// ============================================================================

#[async_trait]
pub trait SignalExtractor: Send + Sync {
    async fn extract(&self, body: &str, url: &str) -> Result<SignalSet, ExtractionError>;
}

// ============================================================================
// PERSIST
// ============================================================================

/// What kind of record is being persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    RawPage,
    Features,
    Analysis,
    BatchResults,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::RawPage => "raw_page",
            ArtifactKind::Features => "features",
            ArtifactKind::Analysis => "analysis",
            ArtifactKind::BatchResults => "batch_results",
        }
    }
}

/// Storage collaborator. `key` is the URL, or the job id for batch results.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn persist(&self, kind: ArtifactKind, key: &str, payload: serde_json::Value) -> Result<(), StoreError>;
}

/// Store that drops everything. Used when no database is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullArtifactStore;

#[async_trait]
impl ArtifactStore for NullArtifactStore {
    async fn persist(&self, kind: ArtifactKind, key: &str, _payload: serde_json::Value) -> Result<(), StoreError> {
        log::trace!("Discarding {} artifact for {}", kind.as_str(), key);
        Ok(())
    }
}
