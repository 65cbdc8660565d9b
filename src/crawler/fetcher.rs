//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests paced by the shared [`RequestPacer`]
//! - Retry logic for transient failures
//! - Error classification into [`FetchError`]

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::scheduler::{ExponentialBackoff, RequestPacer};
use crate::{FetchError, FetchErrorKind};
use reqwest::Client;
use std::time::Duration;

/// A successful (2xx) response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `crawler` - Timeouts
/// * `user_agent` - The user agent configuration
///
/// # Example
///
/// ```no_run
/// use shop_harvest::config::{CrawlerConfig, UserAgentConfig};
/// use shop_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default(), &UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    crawler: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(crawler.request_timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues paced GET requests with bounded retry
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Empty URL | Immediate → InvalidUrl, nothing sent |
/// | HTTP 2xx | Success |
/// | HTTP 429, 5xx | Retry up to `max-retries` times with backoff |
/// | Other HTTP status | Immediate failure |
/// | Timeout, connect, body read | Retry up to `max-retries` times with backoff |
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    pacer: RequestPacer,
    backoff: ExponentialBackoff,
    max_retries: u32,
}

impl Fetcher {
    /// Creates a fetcher from the crawler and user agent settings
    pub fn new(crawler: &CrawlerConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(crawler, user_agent)?;
        Ok(Self::with_client(client, crawler))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, crawler: &CrawlerConfig) -> Self {
        Self {
            client,
            pacer: RequestPacer::new(Duration::from_millis(crawler.min_request_interval_ms)),
            backoff: ExponentialBackoff::from_config(crawler),
            max_retries: crawler.max_retries,
        }
    }

    /// Fetches a URL
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResponse)` - The server answered 2xx
    /// * `Err(FetchError)` - The URL was empty, or every attempt failed
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        if url.trim().is_empty() {
            tracing::error!("Refusing to send a request to an empty URL");
            return Err(FetchError::new(
                url,
                FetchErrorKind::InvalidUrl,
                "URL must not be empty",
            ));
        }

        let mut attempt = 0;
        loop {
            self.pacer.wait_turn().await;
            tracing::debug!(url, attempt, "Sending request");

            match self.fetch_once(url).await {
                Ok(response) => {
                    tracing::info!(url, status = response.status, "Got response");
                    return Ok(response);
                }
                Err(e) if e.kind.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff.delay(attempt);
                    tracing::warn!(
                        url,
                        attempt,
                        "Transient failure ({}), retrying in {:?}",
                        e.detail,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    match e.kind {
                        FetchErrorKind::Status(status) => {
                            tracing::warn!(url, status, "Request failed: {}", e.detail)
                        }
                        _ => tracing::error!(url, kind = %e.kind, "Transport failure: {}", e.detail),
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::new(
                url,
                FetchErrorKind::Status(status.as_u16()),
                status.canonical_reason().unwrap_or("Unknown status"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::new(url, FetchErrorKind::Body, e.to_string()))?;

        Ok(FetchResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Maps a reqwest error onto a fetch error kind
fn classify_reqwest_error(url: &str, error: &reqwest::Error) -> FetchError {
    let kind = if error.is_timeout() {
        FetchErrorKind::Timeout
    } else if error.is_connect() {
        FetchErrorKind::Connect
    } else if error.is_body() || error.is_decode() {
        FetchErrorKind::Body
    } else {
        FetchErrorKind::Other
    };
    FetchError::new(url, kind, error.to_string())
}
