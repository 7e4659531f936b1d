//! Manifest loading
//!
//! This module reads course manifests into the [`Course`](crate::app::models::Course)
//! model. Three JSON layouts are accepted:
//!
//! - a single course object `{ "nome": ..., "aulas": [...] }`
//! - an array of course objects
//! - a bare array of lessons, read as one course with a blank name
//!
//! The input path may also be a directory, in which case every `*.json` file
//! in it is loaded in file name order.
//!
//! # Module Organization
//!
//! - [`types`] - Layout and statistics types
//! - [`loader`] - File and directory loading, layout detection
//!
//! # Example
//!
//! ```rust,no_run
//! use course_fetcher::app::manifest::load_manifest;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = load_manifest(Path::new("cursos/")).await?;
//! println!("{} courses, {} videos", manifest.stats.courses, manifest.stats.videos);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod types;

pub use loader::{load_manifest, load_manifest_file, parse_manifest};
pub use types::{LoadedManifest, ManifestLayout, ManifestStats};
