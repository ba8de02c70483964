//! Callback Dispatcher
//!
//! POSTs a completed job's results to the caller-supplied URL. Retries
//! with exponential backoff; a delivery that never succeeds is logged and
//! counted, and the job itself stays COMPLETED either way.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants;
use crate::logic::batch::{Job, JobId, UrlResult};

/// Jitter added on top of each backoff, as a fraction of it
const MAX_JITTER: f64 = 0.25;

// ============================================================================
// CONFIG & TYPES
// ============================================================================

#[derive(Debug, Clone)]
pub struct CallbackConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub timeout: Duration,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            max_attempts: constants::get_callback_max_attempts(),
            initial_backoff: Duration::from_millis(constants::get_callback_backoff_ms()),
            timeout: Duration::from_secs(constants::DEFAULT_CALLBACK_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallbackError {
    #[error("invalid callback url: {0}")]
    InvalidUrl(String),
    #[error("callback delivery failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
    #[error("http client error: {0}")]
    Client(String),
}

/// Body POSTed to the callback URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub job_id: JobId,
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Vec<UrlResult>,
}

impl CallbackPayload {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            status: job.state.as_str().to_string(),
            completed_at: job.completed_at,
            results: job.ordered_results(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempts: u32,
    pub status: u16,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    pub delivered: u64,
    pub failed: u64,
}

// ============================================================================
// DISPATCHER
// ============================================================================

pub struct CallbackDispatcher {
    config: CallbackConfig,
    http_client: reqwest::Client,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl CallbackDispatcher {
    pub fn new(config: CallbackConfig) -> Result<Self, CallbackError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("{}/{}", constants::APP_NAME, constants::APP_VERSION))
            .build()
            .map_err(|e| CallbackError::Client(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        })
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Deliver a finished job's results to `callback_url`
    pub async fn deliver(&self, callback_url: &str, job: &Job) -> Result<DeliveryReport, CallbackError> {
        self.deliver_payload(callback_url, &CallbackPayload::from_job(job)).await
    }

    pub async fn deliver_payload(
        &self,
        callback_url: &str,
        payload: &CallbackPayload,
    ) -> Result<DeliveryReport, CallbackError> {
        let url = match parse_callback_url(callback_url) {
            Ok(url) => url,
            Err(e) => {
                log::error!("Callback for job {} not sent: {}", payload.job_id, e);
                self.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.http_client.post(url.clone()).json(payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let status = resp.status().as_u16();
                    log::info!(
                        "Callback for job {} delivered to {} ({}, attempt {})",
                        payload.job_id, callback_url, status, attempt
                    );
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                    return Ok(DeliveryReport { attempts: attempt, status });
                }
                Ok(resp) => {
                    last_error = format!("receiver responded with status {}", resp.status().as_u16());
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            log::warn!(
                "Callback attempt {}/{} for job {} failed: {}",
                attempt, max_attempts, payload.job_id, last_error
            );

            if attempt < max_attempts {
                tokio::time::sleep(self.backoff_for(attempt)).await;
            }
        }

        log::error!(
            "Giving up on callback for job {} to {} after {} attempts",
            payload.job_id, callback_url, max_attempts
        );
        self.failed.fetch_add(1, Ordering::Relaxed);

        Err(CallbackError::Exhausted { attempts: max_attempts, last_error })
    }

    /// `initial * 2^(attempt-1)` plus up to 25% jitter
    fn backoff_for(&self, attempt: u32) -> Duration {
        let base = self.config.initial_backoff.saturating_mul(1u32 << (attempt - 1).min(16));
        let jitter = rand::thread_rng().gen_range(0.0..=MAX_JITTER);
        base + base.mul_f64(jitter)
    }
}

/// Callback targets must be absolute http(s) URLs
pub fn parse_callback_url(callback_url: &str) -> Result<reqwest::Url, CallbackError> {
    let url = reqwest::Url::parse(callback_url).map_err(|e| CallbackError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CallbackError::InvalidUrl(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(url)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use parking_lot::Mutex;

    #[derive(Clone)]
    struct Receiver {
        failures_left: Arc<AtomicUsize>,
        hits: Arc<AtomicUsize>,
        last_body: Arc<Mutex<Option<serde_json::Value>>>,
    }

    async fn receive(State(rx): State<Receiver>, Json(body): Json<serde_json::Value>) -> StatusCode {
        rx.hits.fetch_add(1, Ordering::SeqCst);
        *rx.last_body.lock() = Some(body);
        let left = rx.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            rx.failures_left.store(left - 1, Ordering::SeqCst);
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        }
    }

    async fn spawn_receiver(failures: usize) -> (String, Receiver) {
        let rx = Receiver {
            failures_left: Arc::new(AtomicUsize::new(failures)),
            hits: Arc::new(AtomicUsize::new(0)),
            last_body: Arc::new(Mutex::new(None)),
        };
        let app = Router::new().route("/hook", post(receive)).with_state(rx.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/hook", addr), rx)
    }

    fn dispatcher(max_attempts: u32) -> CallbackDispatcher {
        CallbackDispatcher::new(CallbackConfig {
            max_attempts,
            initial_backoff: Duration::from_millis(10),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    fn finished_job() -> Job {
        use crate::logic::analysis::ErrorKind;
        use crate::logic::batch::{ErrorRecord, UrlOutcome};

        let mut job = Job::new(JobId::generate(), vec!["http://a.test".to_string()], None);
        job.record(
            "http://a.test",
            UrlOutcome::Error(ErrorRecord::new("http://a.test", ErrorKind::Fetch, "refused")),
        );
        job
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let (url, rx) = spawn_receiver(1).await;
        let d = dispatcher(3);
        let job = finished_job();

        let report = d.deliver(&url, &job).await.unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(report.status, 200);
        assert_eq!(rx.hits.load(Ordering::SeqCst), 2);
        assert_eq!(d.stats(), DeliveryStats { delivered: 1, failed: 0 });

        let body = rx.last_body.lock().clone().unwrap();
        assert_eq!(body["job_id"], job.job_id.as_str());
        assert_eq!(body["status"], "completed");
        assert_eq!(body["results"][0]["url"], "http://a.test");
        assert_eq!(body["results"][0]["status"], "error");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (url, rx) = spawn_receiver(usize::MAX).await;
        let d = dispatcher(3);

        let err = d.deliver(&url, &finished_job()).await.unwrap_err();
        assert!(matches!(err, CallbackError::Exhausted { attempts: 3, .. }));
        assert_eq!(rx.hits.load(Ordering::SeqCst), 3);
        assert_eq!(d.stats(), DeliveryStats { delivered: 0, failed: 1 });
    }

    #[tokio::test]
    async fn test_unreachable_receiver() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let d = dispatcher(2);
        let err = d.deliver(&format!("http://{}/hook", addr), &finished_job()).await.unwrap_err();
        assert!(matches!(err, CallbackError::Exhausted { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_rejects_bad_url() {
        let d = dispatcher(3);
        assert!(matches!(
            d.deliver("not a url", &finished_job()).await,
            Err(CallbackError::InvalidUrl(_))
        ));
        assert!(matches!(
            d.deliver("ftp://files.test/hook", &finished_job()).await,
            Err(CallbackError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let d = dispatcher(5);
        let first = d.backoff_for(1);
        let third = d.backoff_for(3);
        assert!(first >= Duration::from_millis(10) && first <= Duration::from_micros(12_500));
        assert!(third >= Duration::from_millis(40) && third <= Duration::from_millis(50));
    }
}
