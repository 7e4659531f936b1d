//! Terminal progress display for download runs
//!
//! [`ProgressDisplay`] is the single consumer of the run's
//! [`ProgressEvent`] channel. On a terminal it draws an indicatif
//! `MultiProgress` with one overall `(i/total)` bar and one byte bar per
//! in-flight task; otherwise it prints one plain line per finished task.
//!
//! # Examples
//!
//! ```rust,no_run
//! use course_fetcher::cli::{ProgressConfig, ProgressDisplay};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (tx, rx) = mpsc::channel(256);
//! let display = ProgressDisplay::new(ProgressConfig::default()).spawn(42, rx)?;
//! // hand `tx` to the coordinator, run, then drop every sender
//! drop(tx);
//! let counts = display.await?;
//! println!("{} tasks finished", counts.finished);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use crossterm::terminal;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::coordinator::format_bytes;
use crate::app::worker::{Outcome, ProgressEvent};
use crate::constants::progress;
use crate::errors::ProgressError;

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Draw progress bars when stderr is a terminal
    pub enable_progress_bars: bool,
    /// Title column width; derived from the terminal width when `None`
    pub max_title_width: Option<usize>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: true,
            max_title_width: None,
        }
    }
}

/// Terminal states counted by the display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayCounts {
    pub finished: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DisplayCounts {
    fn record(&mut self, outcome: &Outcome) {
        self.finished += 1;
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Downloaded { .. } => self.downloaded += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Progress display manager
pub struct ProgressDisplay {
    config: ProgressConfig,
    is_terminal: bool,
}

impl ProgressDisplay {
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            config,
            is_terminal: atty::is(atty::Stream::Stderr),
        }
    }

    /// Whether bars (rather than plain lines) will be drawn
    pub fn uses_bars(&self) -> bool {
        self.config.enable_progress_bars && self.is_terminal
    }

    /// Consume `rx` in a background task until every sender is dropped
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Template` if a bar style cannot be built
    pub fn spawn(
        self,
        total: usize,
        rx: mpsc::Receiver<ProgressEvent>,
    ) -> Result<JoinHandle<DisplayCounts>, ProgressError> {
        if self.uses_bars() {
            let width = self.config.max_title_width.unwrap_or_else(terminal_title_width);
            let bars = BarSink::new(total, width)?;
            Ok(tokio::spawn(bars.run(rx)))
        } else {
            Ok(tokio::spawn(run_text(total, rx)))
        }
    }
}

/// Title width that leaves room for the bar and counters
fn terminal_title_width() -> usize {
    match terminal::size() {
        Ok((columns, _)) => (columns as usize)
            .saturating_sub(progress::TASK_LINE_RESERVED_WIDTH)
            .max(10),
        Err(_) => progress::FALLBACK_TITLE_WIDTH,
    }
}

/// Shorten `title` to at most `width` characters
pub fn fit_title(title: &str, width: usize) -> String {
    if title.chars().count() <= width {
        return title.to_string();
    }
    if width <= 3 {
        return title.chars().take(width).collect();
    }
    let kept: String = title.chars().take(width - 3).collect();
    format!("{}...", kept)
}

/// Plain line for a finished task: `(i/total) status title`
pub fn finished_line(finished: usize, total: usize, title: &str, outcome: &Outcome) -> String {
    let detail = match outcome {
        Outcome::Skipped => "already downloaded".to_string(),
        Outcome::Downloaded { bytes } => format_bytes(*bytes),
        Outcome::Failed { reason } => reason.clone(),
    };
    let mark = match outcome {
        Outcome::Skipped => "⏭️",
        Outcome::Downloaded { .. } => "✅",
        Outcome::Failed { .. } => "❌",
    };
    format!("({}/{}) {} {} ({})", finished, total, mark, title, detail)
}

async fn run_text(total: usize, mut rx: mpsc::Receiver<ProgressEvent>) -> DisplayCounts {
    let mut counts = DisplayCounts::default();

    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::Finished { title, outcome, .. } => {
                counts.record(&outcome);
                eprintln!("{}", finished_line(counts.finished, total, &title, &outcome));
            }
            ProgressEvent::Retrying {
                sequence,
                attempt,
                reason,
            } => {
                eprintln!("   #{} retry {} after: {}", sequence, attempt, reason);
            }
            ProgressEvent::Started { .. } | ProgressEvent::Progress { .. } => {}
        }
    }

    debug!("Progress channel closed after {} tasks", counts.finished);
    counts
}

struct BarSink {
    multi: MultiProgress,
    overall: ProgressBar,
    task_style: ProgressStyle,
    tasks: HashMap<usize, ProgressBar>,
    title_width: usize,
    total: usize,
    counts: DisplayCounts,
}

impl BarSink {
    fn new(total: usize, title_width: usize) -> Result<Self, ProgressError> {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(
            progress::MAX_UPDATE_HZ,
        ));

        let overall = multi.add(ProgressBar::new(total as u64));
        overall.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] ({pos}/{len}) {msg}")
                .map_err(|e| ProgressError::Template(e.to_string()))?
                .progress_chars("##-"),
        );

        let task_style = ProgressStyle::default_bar()
            .template("  {prefix:>5} {msg} [{bar:25.green/white}] {bytes}/{total_bytes} {bytes_per_sec}")
            .map_err(|e| ProgressError::Template(e.to_string()))?
            .progress_chars("=> ");

        Ok(Self {
            multi,
            overall,
            task_style,
            tasks: HashMap::new(),
            title_width,
            total,
            counts: DisplayCounts::default(),
        })
    }

    async fn run(mut self, mut rx: mpsc::Receiver<ProgressEvent>) -> DisplayCounts {
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }

        for (_, bar) in self.tasks.drain() {
            bar.finish_and_clear();
        }
        self.overall.finish_with_message(format!(
            "{} downloaded, {} skipped, {} failed",
            self.counts.downloaded, self.counts.skipped, self.counts.failed
        ));
        self.counts
    }

    fn handle(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { sequence, title } => {
                let bar = self.multi.add(ProgressBar::new(0));
                bar.set_style(self.task_style.clone());
                bar.set_prefix(format!("#{}", sequence));
                bar.set_message(fit_title(&title, self.title_width));
                self.tasks.insert(sequence, bar);
            }
            ProgressEvent::Progress {
                sequence,
                bytes,
                total,
            } => {
                if let Some(bar) = self.tasks.get(&sequence) {
                    if let Some(total) = total {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes);
                }
            }
            ProgressEvent::Retrying {
                sequence,
                attempt,
                reason,
            } => {
                let _ = self
                    .multi
                    .println(format!("   #{} retry {} after: {}", sequence, attempt, reason));
            }
            ProgressEvent::Finished {
                sequence,
                title,
                outcome,
            } => {
                if let Some(bar) = self.tasks.remove(&sequence) {
                    bar.finish_and_clear();
                    self.multi.remove(&bar);
                }
                self.counts.record(&outcome);
                self.overall.inc(1);
                if outcome.is_failed() {
                    let _ = self.multi.println(finished_line(
                        self.counts.finished,
                        self.total,
                        &title,
                        &outcome,
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_title() {
        assert_eq!(fit_title("Introdução", 20), "Introdução");
        assert_eq!(fit_title("Introdução ao curso", 10), "Introdu...");
        assert_eq!(fit_title("abcdef", 2), "ab");
    }

    #[test]
    fn test_finished_line() {
        let line = finished_line(3, 10, "Aula 1", &Outcome::Downloaded { bytes: 2048 });
        assert_eq!(line, "(3/10) ✅ Aula 1 (2.0 KB)");

        let line = finished_line(4, 10, "Aula 2", &Outcome::failed("HTTP 500"));
        assert!(line.starts_with("(4/10) ❌ Aula 2"));
        assert!(line.ends_with("(HTTP 500)"));
    }

    #[tokio::test]
    async fn test_text_sink_counts_outcomes() {
        let (tx, rx) = mpsc::channel(16);
        let display = ProgressDisplay {
            config: ProgressConfig::default(),
            is_terminal: false,
        };
        assert!(!display.uses_bars());
        let handle = display.spawn(3, rx).unwrap();

        for (sequence, outcome) in [
            (1, Outcome::Skipped),
            (2, Outcome::Downloaded { bytes: 10 }),
            (3, Outcome::failed("boom")),
        ] {
            tx.send(ProgressEvent::Finished {
                sequence,
                title: format!("t{}", sequence),
                outcome,
            })
            .await
            .unwrap();
        }
        drop(tx);

        let counts = handle.await.unwrap();
        assert_eq!(
            counts,
            DisplayCounts {
                finished: 3,
                downloaded: 1,
                skipped: 1,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_bar_sink_tracks_in_flight_tasks() {
        let mut sink = BarSink::new(2, 20).unwrap();
        sink.multi.set_draw_target(ProgressDrawTarget::hidden());

        sink.handle(ProgressEvent::Started {
            sequence: 1,
            title: "a".to_string(),
        });
        sink.handle(ProgressEvent::Progress {
            sequence: 1,
            bytes: 5,
            total: Some(10),
        });
        assert_eq!(sink.tasks[&1].position(), 5);

        sink.handle(ProgressEvent::Finished {
            sequence: 1,
            title: "a".to_string(),
            outcome: Outcome::Downloaded { bytes: 10 },
        });
        assert!(sink.tasks.is_empty());
        assert_eq!(sink.overall.position(), 1);
        assert_eq!(sink.counts.downloaded, 1);
    }
}
