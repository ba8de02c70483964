//! Batch Coordinator
//!
//! Accepts URL batches, runs one AnalysisWorker per URL behind a
//! semaphore, and records each outcome into the job as it arrives.
//! `submit` returns as soon as the job exists; the work happens on a
//! spawned driver task.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

use super::error::BatchError;
use super::store::JobStore;
use super::types::{ErrorRecord, Job, JobId, RecordResult, UrlOutcome};
use crate::constants;
use crate::logic::analysis::{AnalysisError, AnalysisWorker, ArtifactKind, ErrorKind};
use crate::logic::callback::{parse_callback_url, CallbackDispatcher};
use crate::logic::threat::ThreatVerdict;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Used when a submission does not name a limit
    pub default_concurrency: usize,
    /// Requested limits above this are clamped
    pub max_concurrency: usize,
    pub max_batch_size: usize,
    /// Budget for one URL, fetch to verdict
    pub worker_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            default_concurrency: constants::get_concurrency_limit(),
            max_concurrency: constants::MAX_CONCURRENCY_LIMIT,
            max_batch_size: constants::DEFAULT_MAX_BATCH_SIZE,
            worker_timeout: Duration::from_secs(constants::get_worker_timeout()),
        }
    }
}

// ============================================================================
// COORDINATOR
// ============================================================================

pub struct BatchCoordinator {
    store: Arc<JobStore>,
    worker: Arc<AnalysisWorker>,
    dispatcher: Arc<CallbackDispatcher>,
    config: BatchConfig,
}

impl BatchCoordinator {
    pub fn new(
        store: Arc<JobStore>,
        worker: Arc<AnalysisWorker>,
        dispatcher: Arc<CallbackDispatcher>,
        config: BatchConfig,
    ) -> Self {
        Self {
            store,
            worker,
            dispatcher,
            config,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<CallbackDispatcher> {
        &self.dispatcher
    }

    /// Synchronous single-URL analysis under the worker timeout
    pub async fn analyze_single(&self, url: &str) -> Result<ThreatVerdict, AnalysisError> {
        self.worker.analyze_with_timeout(url, self.config.worker_timeout).await
    }

    /// Create a PENDING job and schedule its work. Must be called from
    /// within a tokio runtime.
    pub fn submit(
        &self,
        urls: Vec<String>,
        callback_url: Option<String>,
        concurrency_limit: Option<usize>,
    ) -> Result<JobId, BatchError> {
        let limit = self.resolve_concurrency(concurrency_limit)?;

        if let Some(cb) = callback_url.as_deref() {
            parse_callback_url(cb).map_err(|e| BatchError::InvalidCallbackUrl(e.to_string()))?;
        }

        let urls: Vec<String> = urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let job = Job::new(JobId::generate(), urls, callback_url);
        if job.urls.len() > self.config.max_batch_size {
            return Err(BatchError::TooLarge {
                size: job.urls.len(),
                limit: self.config.max_batch_size,
            });
        }

        let job_id = job.job_id.clone();
        let urls = job.urls.clone();
        self.store.put(job)?;

        log::info!(
            "Job {} accepted: {} URLs, concurrency {}",
            job_id, urls.len(), limit
        );

        tokio::spawn(run_job(
            self.store.clone(),
            self.worker.clone(),
            self.dispatcher.clone(),
            job_id.clone(),
            urls,
            limit,
            self.config.worker_timeout,
        ));

        Ok(job_id)
    }

    /// Snapshot of a job; a RUNNING job may carry a subset of results
    pub fn get_job(&self, job_id: &JobId) -> Result<Job, BatchError> {
        self.store.get(job_id)
    }

    /// Forget a job. Workers still running for it find nothing to report into.
    pub fn delete_job(&self, job_id: &JobId) -> Result<(), BatchError> {
        self.store.remove(job_id)?;
        log::info!("Job {} deleted", job_id);
        Ok(())
    }

    fn resolve_concurrency(&self, requested: Option<usize>) -> Result<usize, BatchError> {
        let limit = requested.unwrap_or(self.config.default_concurrency);
        if limit == 0 {
            return Err(BatchError::InvalidConcurrency(limit));
        }
        let max = self.config.max_concurrency.max(1);
        if limit > max {
            log::warn!("Concurrency limit {} clamped to {}", limit, max);
            return Ok(max);
        }
        Ok(limit)
    }
}

// ============================================================================
// DRIVER
// ============================================================================

async fn run_job(
    store: Arc<JobStore>,
    worker: Arc<AnalysisWorker>,
    dispatcher: Arc<CallbackDispatcher>,
    job_id: JobId,
    urls: Vec<String>,
    limit: usize,
    worker_timeout: Duration,
) {
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut tasks = JoinSet::new();

    for url in urls {
        // Permit is taken before spawning so at most `limit` tasks exist
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };

        // Doubles as the liveness check: a deleted job gets no new workers
        match store.update(&job_id, |job| job.mark_running()) {
            Ok(true) => log::debug!("Job {} running", job_id),
            Ok(false) => {}
            Err(_) => {
                log::info!("Job {} removed, no further URLs dispatched", job_id);
                break;
            }
        }

        let store = store.clone();
        let worker = worker.clone();
        let job_id = job_id.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let outcome = match worker.analyze_with_timeout(&url, worker_timeout).await {
                Ok(verdict) => UrlOutcome::Verdict(verdict),
                Err(e) => {
                    log::warn!("Job {}: {}", job_id, e);
                    UrlOutcome::Error(ErrorRecord::from(&e))
                }
            };
            record(&store, &job_id, &url, outcome);
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            log::error!("Job {}: worker task did not finish: {}", job_id, e);
        }
    }

    // A task that panicked never reported; close those URLs out
    let missing = match store.get(&job_id) {
        Ok(job) => job.pending_urls(),
        Err(_) => {
            log::info!("Job {} removed while running", job_id);
            return;
        }
    };
    for url in missing {
        let outcome = UrlOutcome::Error(ErrorRecord::new(
            url.clone(),
            ErrorKind::Aborted,
            "worker stopped before producing a result",
        ));
        record(&store, &job_id, &url, outcome);
    }

    let job = match store.get(&job_id) {
        Ok(job) => job,
        Err(_) => return,
    };

    log::info!(
        "Job {} completed: {} URLs, {} errors",
        job_id, job.urls.len(), job.error_count()
    );

    worker.persist_json(ArtifactKind::BatchResults, job_id.as_str(), &job.snapshot());

    if let Some(callback_url) = job.callback_url.as_deref() {
        // Outcome is logged and counted by the dispatcher
        let _ = dispatcher.deliver(callback_url, &job).await;
    }
}

fn record(store: &JobStore, job_id: &JobId, url: &str, outcome: UrlOutcome) {
    match store.update(job_id, |job| job.record(url, outcome)) {
        Ok(RecordResult::Recorded) | Ok(RecordResult::Completed) => {}
        Ok(RecordResult::Duplicate) => log::warn!("Job {}: duplicate result for {} dropped", job_id, url),
        Ok(RecordResult::UnknownUrl) => log::warn!("Job {}: result for unknown URL {} dropped", job_id, url),
        Err(_) => log::debug!("Job {} gone, result for {} dropped", job_id, url),
    }
}

// ============================================================================
// RETENTION
// ============================================================================

/// Periodically evict COMPLETED jobs older than `retention`.
/// PENDING and RUNNING jobs are never touched.
pub fn spawn_retention_sweeper(store: Arc<JobStore>, retention: Duration, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let cutoff = match chrono::Duration::from_std(retention) {
                Ok(age) => Utc::now() - age,
                Err(_) => continue,
            };
            let evicted = store.evict_completed_before(cutoff);
            if evicted > 0 {
                log::info!("Evicted {} completed jobs older than {:?}", evicted, retention);
            }
        }
    })
}

// ============================================================================
// TESTS
// ============================================================================
