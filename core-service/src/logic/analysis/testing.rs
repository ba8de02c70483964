//! In-process collaborators for tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::collaborators::{ArtifactKind, ArtifactStore, FetchedPage, PageFetcher, SignalExtractor};
use super::error::{ExtractionError, FetchError, StoreError};
use crate::logic::threat::SignalSet;

/// Serves a fixed page for every URL unless told otherwise.
/// Tracks how many fetches run at once.
#[derive(Default)]
pub struct FakeFetcher {
    failures: HashMap<String, FetchError>,
    hanging: HashSet<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn with_failure(mut self, url: &str, err: FetchError) -> Self {
        self.failures.insert(url.to_string(), err);
        self
    }

    pub fn with_hang(mut self, url: &str) -> Self {
        self.hanging.insert(url.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.hanging.contains(url) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        } else if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.failures.get(url) {
            Some(err) => Err(err.clone()),
            None => Ok(FetchedPage::new(url, 200, HashMap::new(), "<html></html>".to_string())),
        }
    }
}

/// Returns canned signals per URL, `0.1` everywhere by default
#[derive(Default)]
pub struct FakeExtractor {
    signals: HashMap<String, SignalSet>,
    failures: HashSet<String>,
}

impl FakeExtractor {
    pub fn with_signals(mut self, signals: SignalSet) -> Self {
        self.signals.insert(signals.url().to_string(), signals);
        self
    }

    pub fn with_failure(mut self, url: &str) -> Self {
        self.failures.insert(url.to_string());
        self
    }
}

#[async_trait]
impl SignalExtractor for FakeExtractor {
    async fn extract(&self, _body: &str, url: &str) -> Result<SignalSet, ExtractionError> {
        if self.failures.contains(url) {
            return Err(ExtractionError::Malformed("unparseable markup".to_string()));
        }
        Ok(self
            .signals
            .get(url)
            .cloned()
            .unwrap_or_else(|| SignalSet::new(url, 0.1, 0.1, 0.1)))
    }
}

/// Remembers every artifact; optionally rejects them all
#[derive(Default)]
pub struct RecordingStore {
    records: Mutex<Vec<(ArtifactKind, String, serde_json::Value)>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn kinds_for(&self, key: &str) -> Vec<ArtifactKind> {
        self.records
            .lock()
            .iter()
            .filter(|(_, k, _)| k == key)
            .map(|(kind, _, _)| *kind)
            .collect()
    }

    /// Writes happen in the background; poll until `n` have been tried
    pub async fn wait_for_attempts(&self, n: usize) {
        for _ in 0..200 {
            if self.attempts() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} persist attempts, saw {}", n, self.attempts());
    }

    pub fn payload(&self, kind: ArtifactKind, key: &str) -> Option<serde_json::Value> {
        self.records
            .lock()
            .iter()
            .find(|(k, stored_key, _)| *k == kind && stored_key == key)
            .map(|(_, _, v)| v.clone())
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn persist(&self, kind: ArtifactKind, key: &str, payload: serde_json::Value) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        self.records.lock().push((kind, key.to_string(), payload));
        Ok(())
    }
}

/// Accepts a write and never finishes it
#[derive(Default)]
pub struct StalledStore {
    started: Mutex<Vec<ArtifactKind>>,
}

impl StalledStore {
    pub fn attempts(&self) -> usize {
        self.started.lock().len()
    }

    pub fn kinds(&self) -> Vec<ArtifactKind> {
        self.started.lock().clone()
    }
}

#[async_trait]
impl ArtifactStore for StalledStore {
    async fn persist(&self, kind: ArtifactKind, _key: &str, _payload: serde_json::Value) -> Result<(), StoreError> {
        self.started.lock().push(kind);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}
