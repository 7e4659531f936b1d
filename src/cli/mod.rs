//! Command-line interface components
//!
//! This module contains CLI-specific code for the Course Fetcher
//! application: argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    Cli, Commands, ConfigAction, ConfigArgs, DownloadArgs, GlobalArgs, LayoutArgs, PlanArgs,
    VerifyArgs,
};
pub use commands::{handle_config, handle_download, handle_plan, handle_verify};
pub use progress::{DisplayCounts, ProgressConfig, ProgressDisplay};
