//! Core application logic for Course Fetcher
//!
//! This module contains the pipeline stages: manifest loading, task
//! expansion and naming, file validity probing, the HTTP client, fetch
//! workers and the run coordinator.
//!
//! # Examples
//!
//! ```rust,no_run
//! use course_fetcher::app::{load_manifest, Coordinator, CoordinatorConfig, FetchClient};
//! use course_fetcher::app::{PathNamer, TaskExpander, ValidityChecker};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = load_manifest(Path::new("cursos/")).await?;
//! let expander = TaskExpander::new("aulas", vec!["720p".into()], PathNamer::default());
//! let plan = expander.expand_all(&manifest.courses);
//!
//! let coordinator = Coordinator::new(
//!     CoordinatorConfig::default(),
//!     Arc::new(FetchClient::new()?),
//!     ValidityChecker::default(),
//! )?;
//! let summary = coordinator.run_all(plan.tasks).await;
//! println!("{}", summary.summary());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod coordinator;
pub mod expander;
pub mod manifest;
pub mod models;
pub mod naming;
pub mod verification;
pub mod worker;

// Re-export main public API
pub use client::{ClientConfig, FetchClient};
pub use coordinator::{Coordinator, CoordinatorConfig, RunSummary, TaskFailure};
pub use expander::{
    expand, select_resolution, DuplicateEntry, ExpansionReport, TaskExpander, UnresolvedEntry,
};
pub use manifest::{load_manifest, LoadedManifest, ManifestLayout, ManifestStats};
pub use models::{Course, DownloadTask, Lesson, Resolutions, VideoEntry};
pub use naming::{PathNamer, SanitizePolicy};
pub use verification::{ProbeMode, Validity, ValidityChecker, VerificationReport};
pub use worker::{FetchWorker, Outcome, ProgressEvent, ProgressReporter, WorkerConfig};
