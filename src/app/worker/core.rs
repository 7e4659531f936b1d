//! Core fetch worker implementation
//!
//! A [`FetchWorker`] carries one [`DownloadTask`] from "destination may or may
//! not exist" to a terminal [`Outcome`]:
//!
//! 1. reject destinations longer than the path limit
//! 2. skip destinations that already hold a usable file
//! 3. delete unusable files so they are fetched again
//! 4. create the lesson directory
//! 5. stream the body into place, retrying transient failures
//!
//! Errors never escape `execute`; they become `Outcome::Failed`.

use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::WorkerConfig;
use super::stats::BackoffCalculator;
use super::types::{Outcome, ProgressReporter};
use crate::app::client::{parse_source_url, partial_path, remove_if_exists, FetchClient};
use crate::app::models::DownloadTask;
use crate::app::naming::fits;
use crate::app::verification::{Validity, ValidityChecker};
use crate::errors::{DownloadError, DownloadResult, PathError};

/// Reason recorded for tasks stopped by a shutdown request or deadline
pub const INTERRUPTED_REASON: &str = "interrupted";

/// Executes download tasks; shared by every worker loop of a run
#[derive(Debug, Clone)]
pub struct FetchWorker {
    client: Arc<FetchClient>,
    checker: ValidityChecker,
    config: WorkerConfig,
    cancel: CancellationToken,
}

impl FetchWorker {
    pub fn new(
        client: Arc<FetchClient>,
        checker: ValidityChecker,
        config: WorkerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            checker,
            config,
            cancel,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run one task to completion and report its terminal state
    pub async fn execute(&self, task: &DownloadTask, reporter: &mut ProgressReporter) -> Outcome {
        let outcome = self.process(task, reporter).await;

        match &outcome {
            Outcome::Skipped => info!("Skipped (already valid): {}", task.destination.display()),
            Outcome::Downloaded { bytes } => info!(
                "Downloaded {} ({} bytes)",
                task.destination.display(),
                bytes
            ),
            Outcome::Failed { reason } => {
                warn!("Failed {}: {}", task.destination.display(), reason)
            }
        }

        reporter.finished(&outcome).await;
        outcome
    }

    fn check_path(&self, destination: &Path) -> DownloadResult<()> {
        if fits(destination, self.config.max_path_length) {
            Ok(())
        } else {
            Err(PathError::TooLong {
                path: destination.to_path_buf(),
                max_length: self.config.max_path_length,
            }
            .into())
        }
    }

    async fn process(&self, task: &DownloadTask, reporter: &mut ProgressReporter) -> Outcome {
        let destination = task.destination.as_path();

        if let Err(e) = self.check_path(destination) {
            return Outcome::failed(e.to_string());
        }

        if self.cancel.is_cancelled() {
            return Outcome::failed(INTERRUPTED_REASON);
        }

        match self.checker.classify(destination).await {
            Validity::Usable => return Outcome::Skipped,
            Validity::Missing => {}
            Validity::Corrupt(reason) => {
                warn!(
                    "Existing file {} is unusable ({}), downloading again",
                    destination.display(),
                    reason
                );
                if let Err(e) = remove_if_exists(destination).await {
                    return Outcome::failed(format!("could not remove unusable file: {}", e));
                }
            }
        }

        let url = match parse_source_url(&task.url) {
            Ok(url) => url,
            Err(e) => return Outcome::failed(e.to_string()),
        };

        if let Some(parent) = destination.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                return Outcome::failed(format!(
                    "could not create directory {}: {}",
                    parent.display(),
                    e
                ));
            }
        }

        reporter.started().await;

        let mut retry_count = 0;
        loop {
            match self.attempt(&url, destination, reporter).await {
                Ok(bytes) => return Outcome::Downloaded { bytes },
                Err(DownloadError::Interrupted) => return Outcome::failed(INTERRUPTED_REASON),
                Err(e) if !e.is_transient() || retry_count >= self.config.max_retries => {
                    return Outcome::failed(e.to_string());
                }
                Err(e) => {
                    retry_count += 1;
                    let delay = BackoffCalculator::with_jitter(
                        BackoffCalculator::calculate_retry_delay(
                            retry_count,
                            self.config.retry_base_delay,
                            self.config.retry_max_delay,
                            self.config.retry_backoff_multiplier,
                        ),
                        self.config.backoff_jitter_percentage,
                    );
                    debug!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        task,
                        retry_count,
                        self.config.max_retries + 1,
                        e,
                        delay
                    );
                    reporter.retrying(retry_count, e.to_string()).await;

                    tokio::select! {
                        _ = self.cancel.cancelled() => return Outcome::failed(INTERRUPTED_REASON),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One transfer attempt bounded by the per-task timeout
    async fn attempt(
        &self,
        url: &url::Url,
        destination: &Path,
        reporter: &mut ProgressReporter,
    ) -> Result<u64, DownloadError> {
        let transfer = self
            .client
            .download_file(url, destination, &self.cancel, |received, total| {
                reporter.bytes(received, total)
            });

        match tokio::time::timeout(self.config.download_timeout, transfer).await {
            Ok(result) => result,
            Err(_) => {
                // The dropped transfer could not clean up after itself
                let temp_path = partial_path(destination);
                if let Err(e) = remove_if_exists(&temp_path).await {
                    warn!("Could not remove partial file {}: {}", temp_path.display(), e);
                }
                Err(DownloadError::Timeout {
                    seconds: self.config.download_timeout.as_secs(),
                })
            }
        }
    }
}
