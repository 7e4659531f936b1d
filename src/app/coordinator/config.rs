//! Configuration structures for the scheduler
//!
//! Pool size, run deadline, signal handling and the settings handed to each
//! fetch worker.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::worker::WorkerConfig;
use crate::constants::workers;

/// Configuration for the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Number of concurrent worker loops
    pub worker_count: usize,
    /// Capacity of the progress event channel
    pub progress_buffer_size: usize,
    /// Stop claiming tasks and abort transfers after this long
    #[serde(with = "humantime_serde")]
    pub deadline: Option<Duration>,
    /// Cancel the run on CTRL-C / SIGTERM
    pub handle_signals: bool,
    /// Worker configuration
    #[serde(skip)]
    pub worker_config: WorkerConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            worker_count: workers::DEFAULT_WORKER_COUNT,
            progress_buffer_size: workers::CHANNEL_BUFFER_SIZE,
            deadline: None,
            handle_signals: true,
            worker_config: WorkerConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    pub fn with_worker_config(mut self, worker_config: WorkerConfig) -> Self {
        self.worker_config = worker_config;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("Worker count cannot be zero".to_string());
        }

        if self.worker_count > workers::MAX_WORKER_COUNT {
            return Err(format!(
                "Worker count ({}) exceeds maximum ({})",
                self.worker_count,
                workers::MAX_WORKER_COUNT
            ));
        }

        if self.progress_buffer_size == 0 {
            return Err("Progress buffer size cannot be zero".to_string());
        }

        if self.deadline.map(|d| d.is_zero()).unwrap_or(false) {
            return Err("Deadline cannot be zero".to_string());
        }

        self.worker_config.validate().map_err(|e| e.to_string())
    }
}
