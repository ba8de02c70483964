//! Configuration module

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use webguard_core::constants;
use webguard_core::logic::analysis::FetchConfig;
use webguard_core::logic::batch::BatchConfig;
use webguard_core::logic::callback::CallbackConfig;
use webguard_core::logic::threat::{rules, WeightConfig, WeightError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid fusion weights: {0}")]
    Weights(#[from] WeightError),

    #[error("{key} must be at least 1")]
    Zero { key: &'static str },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL. Persistence is off without one.
    pub database_url: Option<String>,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Fusion weights shared by every analysis
    pub weights: WeightConfig,

    /// Default per-job concurrency
    pub concurrency_limit: usize,

    /// Largest batch accepted
    pub max_batch_size: usize,

    /// Per-URL budget in seconds
    pub worker_timeout_secs: u64,

    /// Page fetch timeout in seconds
    pub fetch_timeout_secs: u64,

    pub callback_max_attempts: u32,
    pub callback_backoff_ms: u64,

    /// Completed jobs are kept this long (seconds)
    pub job_retention_secs: u64,

    /// Retention sweep period (seconds)
    pub job_sweep_interval_secs: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let weights = WeightConfig::new(
            env_or("FUSION_WEIGHT_TEXT", rules::TEXT_WEIGHT),
            env_or("FUSION_WEIGHT_ANOMALY", rules::ANOMALY_WEIGHT),
            env_or("FUSION_WEIGHT_RULES", rules::RULES_WEIGHT),
        )?;

        let config = Self {
            database_url: env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty()),
            port: env_or("PORT", 8080),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            weights,
            concurrency_limit: env_or("BATCH_CONCURRENCY_LIMIT", constants::DEFAULT_CONCURRENCY_LIMIT),
            max_batch_size: env_or("MAX_BATCH_SIZE", constants::DEFAULT_MAX_BATCH_SIZE),
            worker_timeout_secs: env_or("WORKER_TIMEOUT_SECS", constants::DEFAULT_WORKER_TIMEOUT_SECS),
            fetch_timeout_secs: env_or("FETCH_TIMEOUT_SECS", constants::DEFAULT_FETCH_TIMEOUT_SECS),
            callback_max_attempts: env_or("CALLBACK_MAX_ATTEMPTS", constants::DEFAULT_CALLBACK_MAX_ATTEMPTS),
            callback_backoff_ms: env_or("CALLBACK_BACKOFF_MS", constants::DEFAULT_CALLBACK_BACKOFF_MS),
            job_retention_secs: env_or("JOB_RETENTION_SECS", constants::DEFAULT_JOB_RETENTION_SECS),
            job_sweep_interval_secs: env_or("JOB_SWEEP_INTERVAL_SECS", constants::DEFAULT_JOB_SWEEP_INTERVAL_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        let positive = [
            ("BATCH_CONCURRENCY_LIMIT", self.concurrency_limit as u64),
            ("MAX_BATCH_SIZE", self.max_batch_size as u64),
            ("WORKER_TIMEOUT_SECS", self.worker_timeout_secs),
            ("FETCH_TIMEOUT_SECS", self.fetch_timeout_secs),
            ("CALLBACK_MAX_ATTEMPTS", self.callback_max_attempts as u64),
            ("JOB_SWEEP_INTERVAL_SECS", self.job_sweep_interval_secs),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::Zero { key });
            }
        }
        Ok(())
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            default_concurrency: self.concurrency_limit,
            max_concurrency: constants::MAX_CONCURRENCY_LIMIT.max(self.concurrency_limit),
            max_batch_size: self.max_batch_size,
            worker_timeout: Duration::from_secs(self.worker_timeout_secs),
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout_seconds: self.fetch_timeout_secs,
            ..FetchConfig::default()
        }
    }

    pub fn callback_config(&self) -> CallbackConfig {
        CallbackConfig {
            max_attempts: self.callback_max_attempts,
            initial_backoff: Duration::from_millis(self.callback_backoff_ms),
            ..CallbackConfig::default()
        }
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }

    pub fn job_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.job_sweep_interval_secs)
    }
}

impl Default for Config {
    /// Built-in defaults, no environment lookup
    fn default() -> Self {
        Self {
            database_url: None,
            port: 8080,
            environment: "development".to_string(),
            weights: WeightConfig::default(),
            concurrency_limit: constants::DEFAULT_CONCURRENCY_LIMIT,
            max_batch_size: constants::DEFAULT_MAX_BATCH_SIZE,
            worker_timeout_secs: constants::DEFAULT_WORKER_TIMEOUT_SECS,
            fetch_timeout_secs: constants::DEFAULT_FETCH_TIMEOUT_SECS,
            callback_max_attempts: constants::DEFAULT_CALLBACK_MAX_ATTEMPTS,
            callback_backoff_ms: constants::DEFAULT_CALLBACK_BACKOFF_MS,
            job_retention_secs: constants::DEFAULT_JOB_RETENTION_SECS,
            job_sweep_interval_secs: constants::DEFAULT_JOB_SWEEP_INTERVAL_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_production());
        assert_eq!(config.batch_config().default_concurrency, constants::DEFAULT_CONCURRENCY_LIMIT);
        assert_eq!(config.job_retention(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = Config {
            concurrency_limit: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero { key: "BATCH_CONCURRENCY_LIMIT" })
        ));
    }

    #[test]
    fn test_bad_weights_rejected() {
        let mut config = Config::default();
        config.weights.text = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Weights(_))));
    }
}
