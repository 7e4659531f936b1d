//! Error types for Course Fetcher
//!
//! This module defines the error types for every stage of the pipeline.
//! Only manifest and configuration errors are fatal to a run; transfer and
//! path errors are confined to a single task and surface through its outcome.

use std::path::PathBuf;
use thiserror::Error;

/// Manifest loading and parsing errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file or directory not found
    #[error("Manifest not found: {path}")]
    NotFound { path: PathBuf },

    /// JSON parsing error
    #[error("Invalid JSON in manifest {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON parsed but does not describe courses or lessons
    #[error("Unrecognised manifest layout in {path}: {reason}")]
    InvalidLayout { path: PathBuf, reason: String },

    /// Directory given as input holds no manifest files
    #[error("No .json manifest files found in {path}")]
    EmptyDirectory { path: PathBuf },

    /// I/O error reading manifest
    #[error("I/O error reading manifest {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Download and HTTP client errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Download timeout
    #[error("Download timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Resource not found (404)
    #[error("Resource not found: {url}")]
    NotFound { url: String },

    /// Access forbidden (403)
    #[error("Access forbidden: {url}")]
    Forbidden { url: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Incomplete download
    #[error("Incomplete download: received {received} bytes, expected {expected} bytes")]
    IncompleteDownload { received: u64, expected: u64 },

    /// Transfer aborted by shutdown request or deadline
    #[error("Transfer interrupted")]
    Interrupted,

    /// Destination path could not be made short enough
    #[error(transparent)]
    Path(#[from] PathError),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl DownloadError {
    /// Whether a fresh attempt at the same transfer could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::Http(_)
            | DownloadError::Io(_)
            | DownloadError::Timeout { .. }
            | DownloadError::RateLimitExceeded
            | DownloadError::ServerOverloaded
            | DownloadError::IncompleteDownload { .. } => true,
            DownloadError::ServerError { status } => *status >= 500,
            _ => false,
        }
    }
}

/// Path construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Name cannot be shortened enough without cutting into the directory or extension
    #[error("Path cannot be shortened to {max_length} characters: {path}")]
    TooLong { path: PathBuf, max_length: usize },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be rendered back to TOML
    #[error("Could not serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// No per-user configuration directory on this platform
    #[error("Could not determine user config directory")]
    NoConfigDir,
}

/// Progress reporting errors
#[derive(Error, Debug)]
pub enum ProgressError {
    /// Progress bar template rejected by indicatif
    #[error("Progress template error: {0}")]
    Template(String),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Path error
    #[error(transparent)]
    Path(#[from] PathError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Progress error
    #[error(transparent)]
    Progress(#[from] ProgressError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (confined to one task)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Download(_) | AppError::Path(_) | AppError::Progress(_) => true,
            AppError::Manifest(_) | AppError::Config(_) => false,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Manifest(_) => "manifest",
            AppError::Download(_) => "download",
            AppError::Path(_) => "path",
            AppError::Config(_) => "config",
            AppError::Progress(_) => "progress",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
