//! Central Configuration Constants
//!
//! Single source of truth for analysis and batch defaults.
//! Every default can be overridden from the environment.

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "WebGuard";

/// Default number of URLs analysed at once within one job
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;

/// Upper bound a caller may request for one job
pub const MAX_CONCURRENCY_LIMIT: usize = 64;

/// Default largest batch accepted in one submission
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

/// Default time budget for one URL, fetch to verdict (seconds)
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 30;

/// Default HTTP timeout for page fetches (seconds)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;

/// Pages larger than this are rejected
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Bound on one artifact write
pub const DEFAULT_PERSIST_TIMEOUT_SECS: u64 = 10;

/// Default callback delivery attempts
pub const DEFAULT_CALLBACK_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first callback retry (milliseconds)
pub const DEFAULT_CALLBACK_BACKOFF_MS: u64 = 500;

/// Default per-request callback timeout (seconds)
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 10;

/// Completed jobs older than this are evicted (seconds)
pub const DEFAULT_JOB_RETENTION_SECS: u64 = 24 * 60 * 60;

/// How often the retention sweep runs (seconds)
pub const DEFAULT_JOB_SWEEP_INTERVAL_SECS: u64 = 300;

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Get per-job concurrency limit from environment or use default
pub fn get_concurrency_limit() -> usize {
    env_or("WEBGUARD_CONCURRENCY", DEFAULT_CONCURRENCY_LIMIT)
}

/// Get per-URL worker timeout from environment or use default
pub fn get_worker_timeout() -> u64 {
    env_or("WEBGUARD_WORKER_TIMEOUT_SECS", DEFAULT_WORKER_TIMEOUT_SECS)
}

/// Get page fetch timeout from environment or use default
pub fn get_fetch_timeout() -> u64 {
    env_or("WEBGUARD_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)
}

/// Get callback attempt count from environment or use default
pub fn get_callback_max_attempts() -> u32 {
    env_or("WEBGUARD_CALLBACK_MAX_ATTEMPTS", DEFAULT_CALLBACK_MAX_ATTEMPTS)
}

/// Get initial callback backoff from environment or use default
pub fn get_callback_backoff_ms() -> u64 {
    env_or("WEBGUARD_CALLBACK_BACKOFF_MS", DEFAULT_CALLBACK_BACKOFF_MS)
}
