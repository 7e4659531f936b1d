//! Fetch workers
//!
//! A fetch worker executes one download task end to end: path check,
//! validity check of any existing file, directory creation and a streamed,
//! retried transfer. Every task ends in an [`Outcome`]; errors are never
//! propagated to the scheduler.
//!
//! # Module Organization
//!
//! - [`config`] - Retry, timeout and progress settings
//! - [`types`] - Outcomes, progress events and per-task progress reporters
//! - [`stats`] - Retry backoff calculation
//! - [`core`] - The worker itself
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use course_fetcher::app::client::FetchClient;
//! use course_fetcher::app::verification::ValidityChecker;
//! use course_fetcher::app::worker::{FetchWorker, ProgressReporter, WorkerConfig};
//! # use course_fetcher::app::models::DownloadTask;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(task: DownloadTask) -> Result<(), Box<dyn std::error::Error>> {
//! let worker = FetchWorker::new(
//!     Arc::new(FetchClient::new()?),
//!     ValidityChecker::default(),
//!     WorkerConfig::default(),
//!     CancellationToken::new(),
//! );
//! let mut reporter = ProgressReporter::disabled(&task);
//! let outcome = worker.execute(&task, &mut reporter).await;
//! println!("{}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod stats;
pub mod types;

pub use config::WorkerConfig;
pub use core::{FetchWorker, INTERRUPTED_REASON};
pub use stats::BackoffCalculator;
pub use types::{Outcome, ProgressEvent, ProgressReporter};
