//! Command-line argument parsing for Course Fetcher
//!
//! This module defines the CLI structure using clap derive macros. Flags
//! given here override the values loaded from the config file.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::app::{ProbeMode, SanitizePolicy};
use crate::config::{parse_resolution_list, AppConfig};
use crate::constants::workers;

/// Course Fetcher - Download course videos described by JSON manifests
#[derive(Parser, Debug)]
#[command(
    name = "course_fetcher",
    version,
    about = "Download course videos from JSON manifests, healing broken files on re-run",
    long_about = "Downloads every video listed in one or more course manifests into
<root>/<course>/<lesson>/Video N - <title>.mp4. Re-running is safe: files that are
already complete are skipped, and empty or corrupted files are fetched again."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every video in a manifest
    Download(DownloadArgs),

    /// Show the download tasks a manifest expands to
    Plan(PlanArgs),

    /// Check files on disk without downloading
    Verify(VerifyArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Output layout flags shared by download, plan and verify
#[derive(Args, Debug, Clone, Default)]
pub struct LayoutArgs {
    /// Root directory for downloaded courses
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Preferred resolutions, most preferred first (e.g. 720p,480p)
    #[arg(short = 'r', long, value_name = "LIST")]
    pub resolutions: Option<String>,

    /// Extension of downloaded files
    #[arg(long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Longest allowed destination path in characters
    #[arg(long, value_name = "N")]
    pub max_path_length: Option<usize>,

    /// Handling of illegal file name characters: strip, replace or whitelist
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<SanitizePolicy>,
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Manifest file, or directory of manifest files
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Number of concurrent downloads
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Dry run - show what would be downloaded without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Stop the run after this long (e.g. 90m, 2h)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub deadline: Option<Duration>,

    /// How existing files are checked: container or size
    #[arg(long, value_name = "MODE")]
    pub probe: Option<ProbeMode>,

    /// Limit requests per second
    #[arg(long, value_name = "N")]
    pub rate_limit: Option<u32>,

    /// Print plain progress lines instead of progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the plan command
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Manifest file, or directory of manifest files
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Print the task list as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the verify command
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Manifest file, or directory of manifest files
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub layout: LayoutArgs,

    /// How existing files are checked: container or size
    #[arg(long, value_name = "MODE")]
    pub probe: Option<ProbeMode>,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    Init {
        /// Where to write the file (defaults to the per-user location)
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(raw).map_err(|e| e.to_string())
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl LayoutArgs {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(raw) = &self.resolutions {
            if parse_resolution_list(raw).is_empty() {
                return Err("--resolutions needs at least one label".to_string());
            }
        }

        if self.max_path_length == Some(0) {
            return Err("--max-path-length must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Override config values with the flags that were given
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(output) = &self.output {
            config.paths.root = output.clone();
        }
        if let Some(raw) = &self.resolutions {
            config.paths.resolutions = parse_resolution_list(raw);
        }
        if let Some(extension) = &self.extension {
            config.paths.extension = extension.trim_start_matches('.').to_string();
        }
        if let Some(max_path_length) = self.max_path_length {
            config.naming.max_path_length = max_path_length;
        }
        if let Some(policy) = self.policy {
            config.naming.policy = policy;
        }
    }
}

impl DownloadArgs {
    pub fn validate(&self) -> Result<(), String> {
        self.layout.validate()?;

        if let Some(count) = self.workers {
            if count == 0 {
                return Err("Number of workers must be greater than 0".to_string());
            }
            if count > workers::MAX_WORKER_COUNT {
                return Err(format!(
                    "Number of workers cannot exceed {}",
                    workers::MAX_WORKER_COUNT
                ));
            }
        }

        if self.deadline.map(|d| d.is_zero()).unwrap_or(false) {
            return Err("--deadline must be greater than zero".to_string());
        }

        if self.rate_limit == Some(0) {
            return Err("--rate-limit must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Override config values with the flags that were given
    pub fn apply(&self, config: &mut AppConfig) {
        self.layout.apply(config);
        if let Some(count) = self.workers {
            config.scheduler.workers = count;
        }
        if self.deadline.is_some() {
            config.scheduler.deadline = self.deadline;
        }
        if let Some(mode) = self.probe {
            config.verification.mode = mode;
        }
        if self.rate_limit.is_some() {
            config.client.requests_per_second = self.rate_limit;
        }
    }
}

impl VerifyArgs {
    /// Override config values with the flags that were given
    pub fn apply(&self, config: &mut AppConfig) {
        self.layout.apply(config);
        if let Some(mode) = self.probe {
            config.verification.mode = mode;
        }
    }
}
