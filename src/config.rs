//! Configuration management for Course Fetcher
//!
//! Settings come from, in increasing precedence: built-in defaults, a TOML
//! config file, `COURSE_FETCHER_*` environment variables and command line
//! flags (applied by the CLI layer).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{
    ClientConfig, CoordinatorConfig, PathNamer, ProbeMode, SanitizePolicy, TaskExpander,
    ValidityChecker, WorkerConfig,
};
use crate::constants::{env, files, naming, workers};
use crate::errors::{AppError, ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Output layout and resolution preference
    pub paths: PathsConfig,
    /// File and directory naming
    pub naming: NamingConfig,
    /// HTTP client settings
    pub client: ClientConfig,
    /// Retry and timeout settings for each task
    pub worker: WorkerConfig,
    /// Pool size and run limits
    pub scheduler: SchedulerConfig,
    /// Existing-file inspection
    pub verification: VerificationConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where downloads go and which rendition is preferred
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root directory under which course directories are created
    pub root: PathBuf,
    /// Resolution labels, most preferred first
    pub resolutions: Vec<String>,
    /// Extension of downloaded files
    pub extension: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(naming::DEFAULT_ROOT_DIR),
            resolutions: naming::DEFAULT_RESOLUTIONS
                .iter()
                .map(|r| r.to_string())
                .collect(),
            extension: naming::DEFAULT_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Handling of characters that are illegal in file names
    pub policy: SanitizePolicy,
    /// Longest allowed destination path, in characters
    pub max_path_length: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            policy: SanitizePolicy::default(),
            max_path_length: naming::DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of concurrent downloads
    pub workers: usize,
    /// Stop the run after this long
    #[serde(with = "humantime_serde")]
    pub deadline: Option<Duration>,
    /// Cancel the run on CTRL-C / SIGTERM
    pub handle_signals: bool,
    /// Capacity of the progress event channel
    pub progress_buffer_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: workers::DEFAULT_WORKER_COUNT,
            deadline: None,
            handle_signals: true,
            progress_buffer_size: workers::CHANNEL_BUFFER_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// `container` inspects the MP4 structure, `size` only rejects empty files
    pub mode: ProbeMode,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    ///
    /// An explicitly given config file must exist.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `COURSE_FETCHER_*` overrides using `lookup` to read variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(env::WORKERS) {
            self.scheduler.workers =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: env::WORKERS.to_string(),
                        value: value.clone(),
                        reason: "Expected a positive integer".to_string(),
                    })?;
            debug!("{} override: {}", env::WORKERS, self.scheduler.workers);
        }

        if let Some(value) = lookup(env::ROOT) {
            if !value.trim().is_empty() {
                self.paths.root = PathBuf::from(value.trim());
                debug!("{} override: {}", env::ROOT, self.paths.root.display());
            }
        }

        if let Some(value) = lookup(env::RESOLUTIONS) {
            let resolutions = parse_resolution_list(&value);
            if resolutions.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: env::RESOLUTIONS.to_string(),
                    value,
                    reason: "Expected a comma separated list such as 720p,480p".to_string(),
                }
                .into());
            }
            self.paths.resolutions = resolutions;
        }

        Ok(())
    }

    /// Check values that would otherwise only fail once a run starts
    pub fn validate(&self) -> Result<()> {
        if self.paths.resolutions.is_empty() {
            return Err(invalid("paths.resolutions", "[]", "At least one label is required"));
        }
        if self.paths.extension.trim_start_matches('.').is_empty() {
            return Err(invalid(
                "paths.extension",
                &self.paths.extension,
                "Extension cannot be empty",
            ));
        }
        if self.naming.max_path_length == 0 {
            return Err(invalid("naming.max_path_length", "0", "Must be positive"));
        }

        self.client
            .validate()
            .map_err(|reason| invalid("client", "", &reason))?;
        self.coordinator_config()
            .validate()
            .map_err(|reason| invalid("scheduler", "", &reason))?;
        Ok(())
    }

    pub fn namer(&self) -> PathNamer {
        PathNamer::new(
            self.naming.policy,
            self.naming.max_path_length,
            self.paths.extension.clone(),
        )
    }

    pub fn expander(&self) -> TaskExpander {
        TaskExpander::new(
            self.paths.root.clone(),
            self.paths.resolutions.clone(),
            self.namer(),
        )
    }

    pub fn checker(&self) -> ValidityChecker {
        ValidityChecker::new(self.verification.mode)
    }

    /// Worker settings with the naming path limit applied
    pub fn worker_config(&self) -> WorkerConfig {
        self.worker
            .clone()
            .with_max_path_length(self.naming.max_path_length)
    }

    /// Convert to the runtime scheduler configuration
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            worker_count: self.scheduler.workers,
            progress_buffer_size: self.scheduler.progress_buffer_size,
            deadline: self.scheduler.deadline,
            handle_signals: self.scheduler.handle_signals,
            worker_config: self.worker_config(),
        }
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self).map_err(ConfigError::from)?)
    }

    /// Write a commented default config file
    ///
    /// Uses the per-user location when `path` is `None`. Refuses to replace
    /// an existing file unless `force` is set.
    pub async fn init(path: Option<PathBuf>, force: bool) -> Result<PathBuf> {
        let config_path = match path {
            Some(path) => path,
            None => Self::get_default_config_path()?,
        };

        if config_path.exists() && !force {
            return Err(AppError::generic(format!(
                "Config file already exists: {} (use --force to overwrite)",
                config_path.display()
            )));
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::generic(format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        tokio::fs::write(&config_path, Self::generate_default_config_content())
            .await
            .map_err(|e| {
                AppError::generic(format!(
                    "Failed to write config file {}: {}",
                    config_path.display(),
                    e
                ))
            })?;

        info!("Wrote default configuration to {}", config_path.display());
        Ok(config_path)
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(files::LOCAL_CONFIG_FILE)];
        if let Ok(user_path) = Self::get_default_config_path() {
            search_paths.push(user_path);
        }

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Some(path);
            }
        }

        None
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(files::APP_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# Course Fetcher Configuration
# Every setting is optional; omitted values use the defaults shown here.

[paths]
# Directory that receives <course>/<lesson>/Video N - <title>.<ext>
root = "{root}"
# Resolution labels, most preferred first. When none is available the
# first non-empty rendition listed in the manifest is used.
resolutions = [{resolutions}]
extension = "{extension}"

[naming]
# strip | replace | whitelist
policy = "strip"
max_path_length = {max_path_length}

[client]
connect_timeout = "30s"
# Longest silence while reading a response body
read_timeout = "60s"
tcp_keepalive = "30s"
tcp_nodelay = true
pool_idle_timeout = "90s"
pool_max_per_host = 8
# requests_per_second = 4  # Uncomment to pace requests

[worker]
max_retries = 2
retry_base_delay = "500ms"
retry_max_delay = "30s"
retry_backoff_multiplier = 2
backoff_jitter_percentage = 0.1
download_timeout = "2h"
min_progress_update_interval = "100ms"

[scheduler]
workers = {workers}
handle_signals = true
progress_buffer_size = {buffer}
# deadline = "2h"  # Uncomment to stop the run after a fixed time

[verification]
# container | size
mode = "container"

[logging]
level = "info"  # error, warn, info, debug, trace
colored_output = true
"#,
            root = naming::DEFAULT_ROOT_DIR,
            resolutions = naming::DEFAULT_RESOLUTIONS
                .iter()
                .map(|r| format!("\"{}\"", r))
                .collect::<Vec<_>>()
                .join(", "),
            extension = naming::DEFAULT_EXTENSION,
            max_path_length = naming::DEFAULT_MAX_PATH_LENGTH,
            workers = workers::DEFAULT_WORKER_COUNT,
            buffer = workers::CHANNEL_BUFFER_SIZE,
        )
    }
}

/// Split `720p, 480p` style lists, dropping blanks
pub fn parse_resolution_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

fn invalid(field: &str, value: &str, reason: &str) -> AppError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
