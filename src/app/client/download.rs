//! File download operations with atomic writes and streaming
//!
//! Response bodies are streamed chunk by chunk into `<destination>.part` and
//! renamed onto the destination only after the whole body arrived. Any
//! failure removes the partial file, so the destination never holds a
//! truncated download.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult};

/// Where bytes are written while a transfer is in flight
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(files::PARTIAL_FILE_SUFFIX);
    PathBuf::from(name)
}

/// Remove a file, treating "already gone" as success
pub async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// File download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
    read_timeout: Duration,
}

impl<'a> DownloadHandler<'a> {
    pub fn new(http_handler: &'a HttpHandler, read_timeout: Duration) -> Self {
        Self {
            http_handler,
            read_timeout,
        }
    }

    /// Streams `url` to `destination`, returning the number of bytes written
    ///
    /// `on_progress` receives the cumulative byte count and the expected total
    /// (when the server sent a Content-Length) after every chunk.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The HTTP request fails or the server answers with an error status
    /// - The body stalls longer than the read timeout
    /// - Fewer bytes arrive than the Content-Length announced
    /// - `cancel` fires before the transfer completes
    /// - File I/O or the final rename fails
    pub async fn download_file<F>(
        &self,
        url: &Url,
        destination: &Path,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> DownloadResult<u64>
    where
        F: FnMut(u64, Option<u64>),
    {
        let temp_path = partial_path(destination);

        let result = match self
            .stream_to_file(url, &temp_path, cancel, &mut on_progress)
            .await
        {
            Ok(bytes) => fs::rename(&temp_path, destination)
                .await
                .map(|_| bytes)
                .map_err(|_| DownloadError::AtomicOperationFailed {
                    temp_path: temp_path.clone(),
                    final_path: destination.to_path_buf(),
                }),
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = remove_if_exists(&temp_path).await {
                warn!("Could not remove partial file {}: {}", temp_path.display(), e);
            }
        }
        result
    }

    async fn stream_to_file<F>(
        &self,
        url: &Url,
        temp_path: &Path,
        cancel: &CancellationToken,
        on_progress: &mut F,
    ) -> DownloadResult<u64>
    where
        F: FnMut(u64, Option<u64>),
    {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DownloadError::Interrupted),
            response = self.http_handler.get_response(url) => response?,
        };

        let expected = response.content_length();
        on_progress(0, expected);

        let mut file = File::create(temp_path).await?;
        let mut stream = response.bytes_stream();
        let mut received = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DownloadError::Interrupted),
                next = tokio::time::timeout(self.read_timeout, stream.next()) => next,
            };

            let chunk = match next {
                Err(_) => {
                    return Err(DownloadError::Timeout {
                        seconds: self.read_timeout.as_secs(),
                    })
                }
                Ok(None) => break,
                Ok(Some(chunk)) => chunk?,
            };

            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            on_progress(received, expected);
        }

        file.flush().await?;
        drop(file);

        if let Some(expected) = expected {
            if received != expected {
                return Err(DownloadError::IncompleteDownload { received, expected });
            }
        }

        debug!("Received {} bytes from {}", received, url);
        Ok(received)
    }
}
