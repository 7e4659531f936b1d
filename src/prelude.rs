//! Prelude module for the Course Fetcher library
//!
//! Re-exports the items needed to load a manifest, expand it and run the
//! downloads with a single `use course_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use course_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manifest = load_manifest(Path::new("curso.json")).await?;
//!     let plan = TaskExpander::new("aulas", vec!["720p".into()], PathNamer::default())
//!         .expand_all(&manifest.courses);
//!
//!     let coordinator = Coordinator::new(
//!         CoordinatorConfig::default(),
//!         Arc::new(FetchClient::new()?),
//!         ValidityChecker::default(),
//!     )?;
//!     let summary = coordinator.run_all(plan.tasks).await;
//!     println!("{}", summary.summary());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Pipeline components
pub use crate::app::{
    expand, load_manifest, ClientConfig, Coordinator, CoordinatorConfig, Course, DownloadTask,
    FetchClient, Lesson, Outcome, PathNamer, ProbeMode, ProgressEvent, RunSummary,
    SanitizePolicy, TaskExpander, ValidityChecker, VideoEntry, WorkerConfig,
};

pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{DEFAULT_MAX_PATH_LENGTH, DEFAULT_RESOLUTIONS, DEFAULT_WORKER_COUNT};

pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
