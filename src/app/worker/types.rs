//! Worker outcome and progress types
//!
//! Each task ends in exactly one [`Outcome`]. While it runs, the worker sends
//! [`ProgressEvent`]s through its task's [`ProgressReporter`] into a single
//! channel read by one consumer (the progress display).

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::app::models::DownloadTask;

/// Terminal state of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    /// Destination already held a usable file
    Skipped,
    /// File fetched and moved into place
    Downloaded { bytes: u64 },
    /// Task gave up; nothing was left at the destination
    Failed { reason: String },
}

impl Outcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Outcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    /// Short lowercase name for logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Skipped => "skipped",
            Outcome::Downloaded { .. } => "downloaded",
            Outcome::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Skipped => write!(f, "skipped (already valid)"),
            Outcome::Downloaded { bytes } => write!(f, "downloaded {} bytes", bytes),
            Outcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Progress stream item; `sequence` identifies the task within the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Transfer is about to begin
    Started { sequence: usize, title: String },
    /// Cumulative bytes received for the current task
    Progress {
        sequence: usize,
        bytes: u64,
        total: Option<u64>,
    },
    /// A transient failure; the file restarts from byte zero
    Retrying {
        sequence: usize,
        attempt: u32,
        reason: String,
    },
    /// Terminal state reached
    Finished {
        sequence: usize,
        title: String,
        outcome: Outcome,
    },
}

impl ProgressEvent {
    pub fn sequence(&self) -> usize {
        match self {
            ProgressEvent::Started { sequence, .. }
            | ProgressEvent::Progress { sequence, .. }
            | ProgressEvent::Retrying { sequence, .. }
            | ProgressEvent::Finished { sequence, .. } => *sequence,
        }
    }
}

/// Per-task handle onto the shared progress channel
///
/// Byte counts sent through one reporter never decrease: after a retry,
/// progress stays at the previous high-water mark until the new attempt
/// passes it. Byte ticks are throttled and dropped when the channel is
/// full; lifecycle events always wait for room.
#[derive(Debug)]
pub struct ProgressReporter {
    sequence: usize,
    title: String,
    tx: Option<mpsc::Sender<ProgressEvent>>,
    min_interval: Duration,
    last_sent: Option<Instant>,
    reported_bytes: u64,
}

impl ProgressReporter {
    pub fn new(task: &DownloadTask, tx: mpsc::Sender<ProgressEvent>, min_interval: Duration) -> Self {
        Self {
            sequence: task.sequence,
            title: task.title.clone(),
            tx: Some(tx),
            min_interval,
            last_sent: None,
            reported_bytes: 0,
        }
    }

    /// Reporter that discards every event
    pub fn disabled(task: &DownloadTask) -> Self {
        Self {
            sequence: task.sequence,
            title: task.title.clone(),
            tx: None,
            min_interval: Duration::ZERO,
            last_sent: None,
            reported_bytes: 0,
        }
    }

    /// Highest byte count reported so far
    pub fn reported_bytes(&self) -> u64 {
        self.reported_bytes
    }

    pub async fn started(&mut self) {
        let event = ProgressEvent::Started {
            sequence: self.sequence,
            title: self.title.clone(),
        };
        self.send(event).await;
    }

    /// Record cumulative bytes for the current attempt
    pub fn bytes(&mut self, received: u64, total: Option<u64>) {
        if received < self.reported_bytes {
            return;
        }
        let complete = total.map(|t| received >= t).unwrap_or(false);
        let due = self
            .last_sent
            .map(|at| at.elapsed() >= self.min_interval)
            .unwrap_or(true);
        if !(due || complete) || (received == self.reported_bytes && self.last_sent.is_some()) {
            return;
        }

        self.reported_bytes = received;
        self.last_sent = Some(Instant::now());

        let Some(tx) = &self.tx else { return };
        let event = ProgressEvent::Progress {
            sequence: self.sequence,
            bytes: received,
            total,
        };
        if let Err(e) = tx.try_send(event) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    debug!("Progress channel full, skipping update for #{}", self.sequence);
                }
                mpsc::error::TrySendError::Closed(_) => {
                    debug!("Progress channel closed");
                }
            }
        }
    }

    pub async fn retrying(&mut self, attempt: u32, reason: String) {
        let event = ProgressEvent::Retrying {
            sequence: self.sequence,
            attempt,
            reason,
        };
        self.send(event).await;
    }

    pub async fn finished(&mut self, outcome: &Outcome) {
        let event = ProgressEvent::Finished {
            sequence: self.sequence,
            title: self.title.clone(),
            outcome: outcome.clone(),
        };
        self.send(event).await;
    }

    async fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is displaying progress
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn task() -> DownloadTask {
        DownloadTask {
            destination: PathBuf::from("a/Video 1 - x.mp4"),
            url: "http://v/1".to_string(),
            resolution: "720p".to_string(),
            title: "x".to_string(),
            index: 1,
            sequence: 7,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Skipped.label(), "skipped");
        assert_eq!(Outcome::Downloaded { bytes: 3 }.label(), "downloaded");
        assert!(Outcome::failed("x").is_failed());
        assert_eq!(Outcome::failed("boom").to_string(), "failed: boom");
    }

    #[tokio::test]
    async fn test_lifecycle_events_are_delivered() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut reporter = ProgressReporter::new(&task(), tx, Duration::ZERO);

        reporter.started().await;
        reporter.finished(&Outcome::Skipped).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressEvent::Started { sequence: 7, .. }));
        assert!(matches!(
            &events[1],
            ProgressEvent::Finished { outcome: Outcome::Skipped, .. }
        ));
    }

    #[tokio::test]
    async fn test_bytes_never_decrease_across_retries() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut reporter = ProgressReporter::new(&task(), tx, Duration::ZERO);

        for received in [0, 100, 200] {
            reporter.bytes(received, Some(1000));
        }
        // Restarted attempt
        for received in [0, 50, 150, 250, 1000] {
            reporter.bytes(received, Some(1000));
        }

        let bytes: Vec<u64> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Progress { bytes, .. } => Some(bytes),
                _ => None,
            })
            .collect();
        assert_eq!(bytes, vec![0, 100, 200, 250, 1000]);
        assert_eq!(reporter.reported_bytes(), 1000);
    }

    #[tokio::test]
    async fn test_byte_ticks_are_throttled_but_completion_is_sent() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut reporter = ProgressReporter::new(&task(), tx, Duration::from_secs(60));

        reporter.bytes(10, Some(100));
        reporter.bytes(20, Some(100));
        reporter.bytes(30, Some(100));
        reporter.bytes(100, Some(100));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], ProgressEvent::Progress { bytes: 100, .. }));
    }

    #[tokio::test]
    async fn test_full_channel_drops_ticks() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut reporter = ProgressReporter::new(&task(), tx, Duration::ZERO);
        reporter.bytes(1, None);
        reporter.bytes(2, None);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_reporter() {
        let mut reporter = ProgressReporter::disabled(&task());
        reporter.started().await;
        reporter.bytes(5, None);
        reporter.finished(&Outcome::Skipped).await;
        assert_eq!(reporter.reported_bytes(), 5);
    }
}
