//! Core HTTP operations with optional request pacing
//!
//! Sends GET requests and maps HTTP status codes onto [`DownloadError`]
//! variants. Retrying is left to the caller, which restarts whole transfers.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::errors::{DownloadError, DownloadResult};

type DirectRateLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: Option<DirectRateLimiter>,
}

impl HttpHandler {
    /// Creates a new HttpHandler; `requests_per_second` of `None` disables pacing
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ConfigurationError` if the rate is zero
    pub fn new(client: Client, requests_per_second: Option<u32>) -> DownloadResult<Self> {
        let rate_limiter = requests_per_second
            .map(Self::build_rate_limiter)
            .transpose()?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    fn build_rate_limiter(requests_per_second: u32) -> DownloadResult<DirectRateLimiter> {
        let rate = NonZeroU32::new(requests_per_second).ok_or_else(|| {
            DownloadError::ConfigurationError("Rate limit must be non-zero".to_string())
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rate)))
    }

    /// Sends a GET request and returns the response once headers arrive
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request fails or the server answers
    /// with a non-success status
    pub async fn get_response(&self, url: &Url) -> DownloadResult<Response> {
        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                .await;
        }

        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if status.is_success() {
            debug!("{} responded {}", url, status);
            return Ok(response);
        }

        Err(match status {
            StatusCode::NOT_FOUND => DownloadError::NotFound {
                url: url.to_string(),
            },
            StatusCode::FORBIDDEN => DownloadError::Forbidden {
                url: url.to_string(),
            },
            StatusCode::TOO_MANY_REQUESTS => DownloadError::RateLimitExceeded,
            StatusCode::SERVICE_UNAVAILABLE => DownloadError::ServerOverloaded,
            other => DownloadError::ServerError {
                status: other.as_u16(),
            },
        })
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Parse and check a source URL
pub fn parse_source_url(raw: &str) -> DownloadResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| DownloadError::InvalidUrl {
        url: raw.to_string(),
        error: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(DownloadError::InvalidUrl {
            url: raw.to_string(),
            error: format!("unsupported scheme '{}'", scheme),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::config::ClientConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn handler(rps: Option<u32>) -> HttpHandler {
        let client = ClientConfig::default().build_http_client().unwrap();
        HttpHandler::new(client, rps).unwrap()
    }

    #[tokio::test]
    async fn test_rate_limiter_creation() {
        let rate_limiter = HttpHandler::build_rate_limiter(5).unwrap();
        rate_limiter.until_ready().await;
    }

    #[test]
    fn test_rate_limiter_zero_fails() {
        assert!(HttpHandler::build_rate_limiter(0).is_err());
        let client = ClientConfig::default().build_http_client().unwrap();
        assert!(HttpHandler::new(client, Some(0)).is_err());
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        for (route, status) in [("/missing", 404), ("/denied", 403), ("/busy", 503), ("/slow", 429), ("/boom", 500)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }
        let handler = handler(None);
        let url = |route: &str| Url::parse(&format!("{}{}", server.uri(), route)).unwrap();

        assert!(matches!(
            handler.get_response(&url("/missing")).await,
            Err(DownloadError::NotFound { .. })
        ));
        assert!(matches!(
            handler.get_response(&url("/denied")).await,
            Err(DownloadError::Forbidden { .. })
        ));
        assert!(matches!(
            handler.get_response(&url("/busy")).await,
            Err(DownloadError::ServerOverloaded)
        ));
        assert!(matches!(
            handler.get_response(&url("/slow")).await,
            Err(DownloadError::RateLimitExceeded)
        ));
        assert!(matches!(
            handler.get_response(&url("/boom")).await,
            Err(DownloadError::ServerError { status: 500 })
        ));
    }

    #[tokio::test]
    async fn test_success_with_pacing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let handler = handler(Some(50));
        let url = Url::parse(&server.uri()).unwrap();
        let response = handler.get_response(&url).await.unwrap();
        assert_eq!(response.bytes().await.unwrap().as_ref(), b"ok");
    }

    #[test]
    fn test_parse_source_url() {
        assert!(parse_source_url("https://cdn.example.com/v.mp4").is_ok());
        assert!(parse_source_url(" http://cdn/v.mp4 ").is_ok());
        assert!(matches!(
            parse_source_url("not a url"),
            Err(DownloadError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_source_url("ftp://cdn/v.mp4"),
            Err(DownloadError::InvalidUrl { .. })
        ));
    }
}
