//! Worker configuration management
//!
//! Retry, timeout and progress settings shared by every fetch worker.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{limits, naming, workers};
use crate::errors::{DownloadError, DownloadResult};

/// Configuration for fetch workers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Additional attempts after a transient failure
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub retry_base_delay: Duration,
    /// Upper bound on a single retry delay
    #[serde(with = "humantime_serde")]
    pub retry_max_delay: Duration,
    /// Exponential backoff multiplier for retries
    pub retry_backoff_multiplier: u32,
    /// Random spread applied to retry delays (0.0-1.0)
    pub backoff_jitter_percentage: f64,
    /// Timeout for one whole transfer attempt
    #[serde(with = "humantime_serde")]
    pub download_timeout: Duration,
    /// Minimum interval between byte-progress events of one task
    #[serde(with = "humantime_serde")]
    pub min_progress_update_interval: Duration,
    /// Maximum destination path length in characters
    pub max_path_length: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_retries: limits::MAX_RETRIES,
            retry_base_delay: Duration::from_millis(limits::RETRY_BASE_DELAY_MS),
            retry_max_delay: Duration::from_secs(limits::MAX_BACKOFF_SECS),
            retry_backoff_multiplier: workers::RETRY_BACKOFF_MULTIPLIER,
            backoff_jitter_percentage: limits::BACKOFF_JITTER_FACTOR,
            download_timeout: workers::DEFAULT_DOWNLOAD_TIMEOUT,
            min_progress_update_interval: Duration::from_millis(
                workers::MIN_PROGRESS_UPDATE_INTERVAL_MS,
            ),
            max_path_length: naming::DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

impl WorkerConfig {
    /// Validate configuration values and return errors for invalid settings
    pub fn validate(&self) -> DownloadResult<()> {
        if self.retry_base_delay > self.retry_max_delay {
            return Err(DownloadError::ConfigurationError(
                "Retry base delay must not exceed max delay".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.backoff_jitter_percentage) {
            return Err(DownloadError::ConfigurationError(
                "Backoff jitter percentage must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.retry_backoff_multiplier == 0 {
            return Err(DownloadError::ConfigurationError(
                "Retry backoff multiplier must be at least 1".to_string(),
            ));
        }

        if self.download_timeout.is_zero() {
            return Err(DownloadError::ConfigurationError(
                "Download timeout must be greater than zero".to_string(),
            ));
        }

        if self.max_path_length == 0 {
            return Err(DownloadError::ConfigurationError(
                "Maximum path length must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delays(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.retry_max_delay = max;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_max_path_length(mut self, max_path_length: usize) -> Self {
        self.max_path_length = max_path_length;
        self
    }
}
