//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building the HTTP client (user agent, timeouts, custom headers)
//! - HTTP Basic authentication
//! - Retry with capped exponential backoff for transient failures
//! - Error classification
//!
//! Every attempt, including retries, first passes the shared rate limiter.

use crate::config::{BasicAuth, CrawlConfig};
use crate::crawler::monitor::Cancelled;
use crate::crawler::rate_limit::RateLimiter;
use crate::ConfigError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct Fetched {
    /// URL after redirects
    pub final_url: Url,

    pub status: u16,

    pub content_type: Option<String>,

    pub body: String,

    /// Number of attempts made, including the successful one
    pub attempts: u32,
}

/// Why a single attempt failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("not an HTML document (Content-Type: {0})")]
    ContentMismatch(String),

    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether another attempt could succeed
    ///
    /// | Condition | Retried |
    /// |-----------|---------|
    /// | HTTP 5xx, 408, 429 | yes |
    /// | Other HTTP 4xx | no |
    /// | Timeout, connection error | yes |
    /// | Content-Type mismatch | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status(status) => *status >= 500 || *status == 408 || *status == 429,
            Self::Network(_) | Self::Timeout => true,
            Self::ContentMismatch(_) | Self::Cancelled => false,
        }
    }
}

impl From<Cancelled> for FetchError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

/// A page that could not be fetched
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub error: FetchError,
    pub attempts: u32,
}

/// Retry settings
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retry_limit: u32,
    pub base_delay: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            retry_limit: config.retry_limit,
            base_delay: config.retry_base_delay(),
            max_backoff: config.max_backoff(),
        }
    }

    /// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_backoff)
    }
}

/// Builds the HTTP client shared by page and robots.txt requests
///
/// # Arguments
///
/// * `config` - The crawl configuration (user agent, timeout, custom headers)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(ConfigError)` - A custom header is invalid or the client could not be built
pub fn build_http_client(config: &CrawlConfig) -> Result<Client, ConfigError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(format!("invalid header name '{}'", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ConfigError::InvalidHeader(format!("invalid value for '{}'", name)))?;
        headers.insert(name, value);
    }

    let timeout = config.request_timeout();

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|e| ConfigError::Validation(format!("failed to build HTTP client: {}", e)))
}

/// Page fetcher with authentication, rate limiting and retries
pub struct Fetcher {
    client: Client,
    auth: Option<BasicAuth>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(
        client: Client,
        auth: Option<BasicAuth>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            auth,
            limiter,
            retry,
        }
    }

    /// Fetches a page, retrying transient failures
    ///
    /// At most `retry_limit + 1` requests are sent for one URL. Cancellation
    /// is observed while waiting for the rate limiter and between attempts;
    /// a request already on the wire runs until it completes or times out.
    pub async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> Result<Fetched, FetchFailure> {
        let mut attempt = 0;

        loop {
            if let Err(cancelled) = self.limiter.throttle(cancel).await {
                return Err(FetchFailure {
                    error: cancelled.into(),
                    attempts: attempt,
                });
            }

            let error = match self.attempt(url).await {
                Ok(mut fetched) => {
                    fetched.attempts = attempt + 1;
                    return Ok(fetched);
                }
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.retry.retry_limit {
                debug!("Giving up on {} after {} attempt(s): {}", url, attempt + 1, error);
                return Err(FetchFailure {
                    error,
                    attempts: attempt + 1,
                });
            }

            let delay = self.retry.backoff(attempt);
            warn!(
                "Attempt {} for {} failed ({}), retrying in {:?}",
                attempt + 1,
                url,
                error,
                delay
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    return Err(FetchFailure {
                        error: FetchError::Cancelled,
                        attempts: attempt + 1,
                    });
                }
            }

            attempt += 1;
        }
    }

    async fn attempt(&self, url: &Url) -> Result<Fetched, FetchError> {
        let mut request = self.client.get(url.clone());
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(ct) = &content_type {
            if !is_markup(ct) {
                return Err(FetchError::ContentMismatch(ct.clone()));
            }
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(classify)?;

        Ok(Fetched {
            final_url,
            status: status.as_u16(),
            content_type,
            body,
            attempts: 1,
        })
    }
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(error.to_string())
    }
}

/// HTML and XML (XHTML) documents are accepted
fn is_markup(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("html") || content_type.contains("xml")
}
