//! Course Fetcher Library
//!
//! Downloads course videos described by JSON manifests into a
//! `<root>/<course>/<lesson>/Video N - <title>.<ext>` tree. Runs are
//! idempotent: usable files are skipped, and empty or corrupted files are
//! detected and fetched again.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
