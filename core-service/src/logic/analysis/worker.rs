//! Analysis Worker
//!
//! Drives one URL through fetch → extract → fuse. Artifacts produced on
//! the way are queued to a background writer: a slow or failing store
//! never delays or fails the analysis.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use super::collaborators::{ArtifactKind, ArtifactStore, PageFetcher, SignalExtractor};
use super::error::AnalysisError;
use crate::constants;
use crate::logic::threat::{fuse, ThreatVerdict, WeightConfig};

pub struct AnalysisWorker {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn SignalExtractor>,
    store: Arc<dyn ArtifactStore>,
    weights: Arc<WeightConfig>,
    persist_timeout: Duration,
}

impl AnalysisWorker {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn SignalExtractor>,
        store: Arc<dyn ArtifactStore>,
        weights: Arc<WeightConfig>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            store,
            weights,
            persist_timeout: Duration::from_secs(constants::DEFAULT_PERSIST_TIMEOUT_SECS),
        }
    }

    /// Bound on a single artifact write
    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    /// Analyze one URL. Any collaborator failure short-circuits.
    pub async fn analyze(&self, url: &str) -> Result<ThreatVerdict, AnalysisError> {
        let artifacts = self.artifact_queue();

        let page = self.fetcher
            .fetch(url)
            .await
            .map_err(|source| AnalysisError::Fetch { url: url.to_string(), source })?;

        artifacts.push(ArtifactKind::RawPage, url, &serde_json::json!({
            "url": page.url,
            "status": page.status_code,
            "headers": page.headers,
            "content_sha256": page.content_sha256,
            "fetched_at": page.fetched_at,
            "html_content": page.body,
        }));

        let signals = self.extractor
            .extract(&page.body, url)
            .await
            .map_err(|source| AnalysisError::Extraction { url: url.to_string(), source })?;

        artifacts.push(ArtifactKind::Features, url, &signals);

        signals
            .validate()
            .map_err(|source| AnalysisError::Fusion { url: url.to_string(), source })?;

        let verdict = fuse(&signals, &self.weights);
        log::debug!(
            "{} -> score {:.4} ({}), confidence {:.4}",
            url, verdict.score, verdict.level, verdict.confidence
        );

        artifacts.push(ArtifactKind::Analysis, url, &verdict);

        Ok(verdict)
    }

    /// Same as `analyze`, bounded by `budget`. Artifact writes are not
    /// part of the budget.
    pub async fn analyze_with_timeout(&self, url: &str, budget: Duration) -> Result<ThreatVerdict, AnalysisError> {
        match tokio::time::timeout(budget, self.analyze(url)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("Analysis of {} exceeded {:?}", url, budget);
                Err(AnalysisError::Timeout { url: url.to_string(), budget })
            }
        }
    }

    /// Fire-and-forget write of a single artifact
    pub fn persist_json<T: Serialize + ?Sized>(&self, kind: ArtifactKind, key: &str, payload: &T) {
        self.artifact_queue().push(kind, key, payload);
    }

    /// Spawns a writer that drains the queue in order and exits once the
    /// queue is dropped
    fn artifact_queue(&self) -> ArtifactQueue {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingArtifact>();
        let store = self.store.clone();
        let budget = self.persist_timeout;

        tokio::spawn(async move {
            while let Some(artifact) = rx.recv().await {
                let PendingArtifact { kind, key, payload } = artifact;
                match tokio::time::timeout(budget, store.persist(kind, &key, payload)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => log::warn!("Failed to persist {} artifact for {}: {}", kind.as_str(), key, e),
                    Err(_) => log::warn!(
                        "Persisting {} artifact for {} exceeded {:?}, dropped",
                        kind.as_str(), key, budget
                    ),
                }
            }
        });

        ArtifactQueue { tx }
    }
}

struct PendingArtifact {
    kind: ArtifactKind,
    key: String,
    payload: serde_json::Value,
}

struct ArtifactQueue {
    tx: mpsc::UnboundedSender<PendingArtifact>,
}

impl ArtifactQueue {
    fn push<T: Serialize + ?Sized>(&self, kind: ArtifactKind, key: &str, payload: &T) {
        let payload = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Failed to serialize {} artifact for {}: {}", kind.as_str(), key, e);
                return;
            }
        };

        let artifact = PendingArtifact { kind, key: key.to_string(), payload };
        if self.tx.send(artifact).is_err() {
            log::warn!("Artifact writer for {} is gone, {} artifact dropped", key, kind.as_str());
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
