//! Application constants for Course Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// Overrides the concurrency limit
    pub const WORKERS: &str = "COURSE_FETCHER_WORKERS";

    /// Overrides the download root directory
    pub const ROOT: &str = "COURSE_FETCHER_ROOT";

    /// Overrides the resolution preference list (comma separated)
    pub const RESOLUTIONS: &str = "COURSE_FETCHER_RESOLUTIONS";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("Course-Fetcher/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP read timeout between bytes
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 8;

    /// TCP keep-alive interval
    pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
}

/// Retry configuration
pub mod limits {
    /// Maximum retry attempts for a failed transfer
    pub const MAX_RETRIES: u32 = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 500;

    /// Maximum backoff delay (seconds)
    pub const MAX_BACKOFF_SECS: u64 = 30;

    /// Jitter factor for randomizing delays (0.0-1.0)
    pub const BACKOFF_JITTER_FACTOR: f64 = 0.1;
}

/// File naming and layout constants
pub mod naming {
    /// Default download root, as used by the original course layout
    pub const DEFAULT_ROOT_DIR: &str = "aulas";

    /// Default media file extension
    pub const DEFAULT_EXTENSION: &str = "mp4";

    /// Default maximum total path length in characters
    pub const DEFAULT_MAX_PATH_LENGTH: usize = 190;

    /// Marker appended to shortened file names
    pub const TRUNCATION_MARKER: &str = "...";

    /// Substitute for names that sanitize to nothing
    pub const EMPTY_NAME_PLACEHOLDER: &str = "untitled";

    /// Substitute character for the `replace` policy
    pub const REPLACEMENT_CHAR: char = '_';

    /// Characters never allowed in a path segment
    pub const ILLEGAL_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

    /// Default resolution preference, most desirable first
    pub const DEFAULT_RESOLUTIONS: &[&str] = &["720p", "480p", "360p"];
}

/// File operation constants
pub mod files {
    /// Suffix of in-flight downloads before they are renamed into place
    pub const PARTIAL_FILE_SUFFIX: &str = ".part";

    /// Manifest file extension searched for in directories
    pub const MANIFEST_EXTENSION: &str = "json";

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "course-fetcher.toml";

    /// Application directory name under the user config dir
    pub const APP_DIR_NAME: &str = "course-fetcher";
}

/// Media probing constants
pub mod probe {
    /// Largest `moov` box read into memory while probing
    pub const MAX_MOOV_SIZE: u64 = 64 * 1024 * 1024;

    /// Maximum number of top-level boxes walked before giving up
    pub const MAX_TOP_LEVEL_BOXES: usize = 1024;

    /// Bytes of the first sample inspected for content
    pub const SAMPLE_PEEK_BYTES: usize = 64;
}

/// Worker and concurrency configuration
pub mod workers {
    use super::Duration;

    /// Default concurrency limit for the pooled variant
    pub const DEFAULT_WORKER_COUNT: usize = 5;

    /// Maximum recommended concurrent workers
    pub const MAX_WORKER_COUNT: usize = 64;

    /// Channel buffer size for progress events
    pub const CHANNEL_BUFFER_SIZE: usize = 256;

    /// Timeout for a single file transfer
    pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

    /// Minimum interval between byte-progress events for one task (milliseconds)
    pub const MIN_PROGRESS_UPDATE_INTERVAL_MS: u64 = 100;

    /// Exponential backoff multiplier for retries
    pub const RETRY_BACKOFF_MULTIPLIER: u32 = 2;
}

/// Progress reporting and monitoring
pub mod progress {
    /// Progress bar redraw frequency (Hz)
    pub const MAX_UPDATE_HZ: u8 = 10;

    /// Width reserved for bar, counters and rate in a task line
    pub const TASK_LINE_RESERVED_WIDTH: usize = 60;

    /// Title width used when the terminal size is unknown
    pub const FALLBACK_TITLE_WIDTH: usize = 40;
}

// Re-export commonly used constants for convenience
pub use files::PARTIAL_FILE_SUFFIX;
pub use http::USER_AGENT;
pub use limits::MAX_RETRIES;
pub use naming::{DEFAULT_MAX_PATH_LENGTH, DEFAULT_RESOLUTIONS, DEFAULT_ROOT_DIR};
pub use workers::DEFAULT_WORKER_COUNT;
