//! Run summary tracking
//!
//! Counts task outcomes for one run and records when it started and ended.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::models::DownloadTask;
use crate::app::worker::Outcome;

/// A task that ended in `Outcome::Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub sequence: usize,
    pub title: String,
    pub destination: PathBuf,
    pub reason: String,
}

/// Final result of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Tasks handed to the scheduler
    pub total_tasks: usize,
    /// Tasks that transferred a file
    pub downloaded: usize,
    /// Tasks whose destination was already usable
    pub skipped: usize,
    /// Tasks that failed, including interrupted ones
    pub failed: usize,
    /// Tasks never claimed because the run was cancelled
    pub not_started: usize,
    /// Bytes written by downloaded tasks
    pub total_bytes: u64,
    /// Whether a signal or deadline stopped the run early
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Failed tasks in run order
    pub failures: Vec<TaskFailure>,
}

impl RunSummary {
    /// Empty summary for a run that starts now
    pub fn start(total_tasks: usize) -> Self {
        let now = Utc::now();
        Self {
            total_tasks,
            downloaded: 0,
            skipped: 0,
            failed: 0,
            not_started: total_tasks,
            total_bytes: 0,
            interrupted: false,
            started_at: now,
            finished_at: now,
            elapsed: Duration::ZERO,
            failures: Vec::new(),
        }
    }

    /// Count the outcome of one claimed task
    pub fn record(&mut self, task: &DownloadTask, outcome: &Outcome) {
        self.not_started = self.not_started.saturating_sub(1);
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Downloaded { bytes } => {
                self.downloaded += 1;
                self.total_bytes += bytes;
            }
            Outcome::Failed { reason } => {
                self.failed += 1;
                self.failures.push(TaskFailure {
                    sequence: task.sequence,
                    title: task.title.clone(),
                    destination: task.destination.clone(),
                    reason: reason.clone(),
                });
            }
        }
    }

    /// Stamp the end time
    pub fn finish(&mut self, elapsed: Duration) {
        self.finished_at = Utc::now();
        self.elapsed = elapsed;
    }

    /// Tasks that reached a terminal state
    pub fn processed(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }

    /// Every task either downloaded or skipped
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.not_started == 0
    }

    /// One-line description of the run
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} downloaded, {} skipped, {} failed of {} tasks ({}) in {}",
            self.downloaded,
            self.skipped,
            self.failed,
            self.total_tasks,
            format_bytes(self.total_bytes),
            format_duration(self.elapsed)
        );
        if self.not_started > 0 {
            line.push_str(&format!(", {} not started", self.not_started));
        }
        line
    }
}

/// Format a byte count with binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Format a duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        format!("{}m{}s", total_secs / 60, total_secs % 60)
    } else {
        format!("{}h{}m", total_secs / 3600, (total_secs % 3600) / 60)
    }
}
