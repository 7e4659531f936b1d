//! Run orchestration
//!
//! The coordinator runs a pre-computed task list through a fixed-size pool of
//! worker loops and returns a [`RunSummary`].
//!
//! # Architecture
//!
//! - [`config`] - Pool size, deadline and signal settings
//! - [`queue`] - Immutable task list with an atomic claim cursor
//! - [`stats`] - Outcome counting and the final summary
//! - [`signals`] - CTRL-C / SIGTERM and deadline cancellation
//!
//! Each loop claims the next task index, executes it in its own tokio task
//! and records the outcome. No task waits on another, a failed task never
//! cancels its siblings, and a panic while executing one task is recorded as
//! that task's failure while the loop moves on. Once the run's cancellation
//! token fires, loops stop claiming; in-flight transfers abort and clean up,
//! and tasks never claimed are counted as not started.
//!
//! # Examples
//!
//! ```rust,no_run
//! use course_fetcher::app::client::FetchClient;
//! use course_fetcher::app::coordinator::{Coordinator, CoordinatorConfig};
//! use course_fetcher::app::verification::ValidityChecker;
//! # use course_fetcher::app::models::DownloadTask;
//! use std::sync::Arc;
//!
//! # async fn example(tasks: Vec<DownloadTask>) -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = Coordinator::new(
//!     CoordinatorConfig::default().with_worker_count(5),
//!     Arc::new(FetchClient::new()?),
//!     ValidityChecker::default(),
//! )?;
//! let summary = coordinator.run(tasks, 5).await;
//! println!("{}", summary.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod queue;
pub mod signals;
pub mod stats;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::app::client::FetchClient;
use crate::app::models::DownloadTask;
use crate::app::verification::ValidityChecker;
use crate::app::worker::{FetchWorker, Outcome, ProgressEvent, ProgressReporter};
use crate::errors::{DownloadError, DownloadResult};

pub use config::CoordinatorConfig;
pub use queue::TaskQueue;
pub use signals::{spawn_deadline, SignalHandler};
pub use stats::{format_bytes, format_duration, RunSummary, TaskFailure};

/// Reason recorded for a task whose execution panicked
pub const PANIC_REASON: &str = "worker panicked";

/// Scheduler for a bounded pool of fetch workers
pub struct Coordinator {
    config: CoordinatorConfig,
    worker: FetchWorker,
    cancel: CancellationToken,
    progress_tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl Coordinator {
    /// Create a coordinator with its own cancellation token
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ConfigurationError` if the configuration is invalid
    pub fn new(
        config: CoordinatorConfig,
        client: Arc<FetchClient>,
        checker: ValidityChecker,
    ) -> DownloadResult<Self> {
        config.validate().map_err(DownloadError::ConfigurationError)?;

        let cancel = CancellationToken::new();
        let worker = FetchWorker::new(client, checker, config.worker_config.clone(), cancel.clone());

        Ok(Self {
            config,
            worker,
            cancel,
            progress_tx: None,
        })
    }

    /// Send progress events of every task into `tx`
    pub fn with_progress(mut self, tx: mpsc::Sender<ProgressEvent>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Token that stops the run when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run with the configured pool size
    pub async fn run_all(&self, tasks: Vec<DownloadTask>) -> RunSummary {
        self.run(tasks, self.config.worker_count).await
    }

    /// Execute every task with at most `concurrency_limit` in flight
    pub async fn run(&self, tasks: Vec<DownloadTask>, concurrency_limit: usize) -> RunSummary {
        let started = Instant::now();
        let total = tasks.len();
        let mut summary = RunSummary::start(total);
        let pool_size = concurrency_limit.max(1).min(total.max(1));

        info!("Starting run: {} tasks, {} workers", total, pool_size);

        let signal_handle = self
            .config
            .handle_signals
            .then(|| SignalHandler::new(self.cancel.clone()).setup());
        let deadline_handle = self
            .config
            .deadline
            .map(|deadline| spawn_deadline(self.cancel.clone(), deadline));

        let queue = Arc::new(TaskQueue::new(tasks));
        let interval = self.worker.config().min_progress_update_interval;

        let handles: Vec<JoinHandle<Vec<(usize, Outcome)>>> = (0..pool_size)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    queue.clone(),
                    self.worker.clone(),
                    self.progress_tx.clone(),
                    interval,
                ))
            })
            .collect();

        let mut outcomes: Vec<Option<Outcome>> = vec![None; total];
        for handle in handles {
            match handle.await {
                Ok(done) => {
                    for (index, outcome) in done {
                        outcomes[index] = Some(outcome);
                    }
                }
                Err(e) => error!("Worker loop aborted: {}", e),
            }
        }

        summary.interrupted = self.cancel.is_cancelled();
        for handle in [signal_handle, deadline_handle].into_iter().flatten() {
            handle.abort();
        }

        for (task, outcome) in queue.tasks().iter().zip(&outcomes) {
            if let Some(outcome) = outcome {
                summary.record(task, outcome);
            }
        }
        summary.finish(started.elapsed());

        info!("Run finished: {}", summary.summary());
        summary
    }
}

async fn worker_loop(
    id: usize,
    queue: Arc<TaskQueue>,
    worker: FetchWorker,
    progress_tx: Option<mpsc::Sender<ProgressEvent>>,
    interval: Duration,
) -> Vec<(usize, Outcome)> {
    let mut done = Vec::new();

    while !worker.cancel_token().is_cancelled() {
        let Some((index, task)) = queue.claim() else {
            break;
        };
        let task = task.clone();
        debug!("Worker {} claimed {}", id, task);

        let mut reporter = match &progress_tx {
            Some(tx) => ProgressReporter::new(&task, tx.clone(), interval),
            None => ProgressReporter::disabled(&task),
        };

        let execution = {
            let worker = worker.clone();
            let task = task.clone();
            tokio::spawn(async move { worker.execute(&task, &mut reporter).await })
        };

        let outcome = match execution.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Worker {} crashed on {}: {}", id, task, e);
                let outcome = Outcome::failed(PANIC_REASON);
                if let Some(tx) = &progress_tx {
                    let _ = tx
                        .send(ProgressEvent::Finished {
                            sequence: task.sequence,
                            title: task.title.clone(),
                            outcome: outcome.clone(),
                        })
                        .await;
                }
                outcome
            }
        };
        done.push((index, outcome));
    }

    debug!("Worker {} finished after {} tasks", id, done.len());
    done
}
