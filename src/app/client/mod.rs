//! HTTP client for fetching media files
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: request sending, optional pacing and status mapping
//! - `download`: streamed file downloads with atomic writes

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use crate::errors::DownloadResult;

pub mod config;
pub mod download;
pub mod http;

pub use config::ClientConfig;
pub use download::{partial_path, remove_if_exists};
pub use http::parse_source_url;

use download::DownloadHandler;
use http::HttpHandler;

/// HTTP client shared by every worker of a run
///
/// Holds one connection pool; cloning is not needed because workers borrow
/// it through an `Arc`.
#[derive(Debug)]
pub struct FetchClient {
    http_handler: HttpHandler,
    config: ClientConfig,
}

impl FetchClient {
    /// Creates a client with default settings
    pub fn new() -> DownloadResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the configuration is invalid or the
    /// underlying HTTP client cannot be built
    pub fn with_config(config: ClientConfig) -> DownloadResult<Self> {
        config
            .validate()
            .map_err(crate::errors::DownloadError::ConfigurationError)?;
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.requests_per_second)?;
        info!(
            "Created HTTP client (pacing: {})",
            config
                .requests_per_second
                .map(|rps| format!("{} req/s", rps))
                .unwrap_or_else(|| "off".to_string())
        );
        Ok(Self {
            http_handler,
            config,
        })
    }

    /// Streams `url` into `destination` via a `.part` file
    ///
    /// See [`DownloadHandler::download_file`] for the progress callback
    /// contract and error cases.
    pub async fn download_file<F>(
        &self,
        url: &Url,
        destination: &Path,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> DownloadResult<u64>
    where
        F: FnMut(u64, Option<u64>),
    {
        DownloadHandler::new(&self.http_handler, self.config.read_timeout)
            .download_file(url, destination, cancel, on_progress)
            .await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
