//! HTTP fetcher with rate limiting and retry
//!
//! This module provides the transport layer for the trends client with
//! features including:
//! - User-Agent rotation
//! - Rate limiting with governor
//! - Automatic retry with exponential backoff
//! - Shared cookie store across requests

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT},
    Client, StatusCode,
};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Transport-level errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP client error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Server returned a non-success status
    #[error("Server returned status {0}")]
    ServerError(u16),

    /// All retry attempts exhausted
    #[error("Maximum retry attempts exceeded")]
    MaxRetriesExceeded,

    /// The request URL could not be built
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Check if this error is recoverable (can be retried)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout | Self::MaxRetriesExceeded => true,
            Self::ServerError(status) => Fetcher::should_retry(*status),
            Self::InvalidUrl(_) => false,
        }
    }
}

/// Rate-limited HTTP fetcher with retry logic
///
/// Requests share one cookie store; the upstream hands out a session cookie
/// on the first request and expects it back on widget data calls.
pub struct Fetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Maximum number of retry attempts for failed requests
    max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    base_delay_ms: u64,

    /// Accept-Language value derived from the configured language
    accept_language: String,

    /// Fixed User-Agent override; rotates through the pool when unset
    user_agent: Option<String>,
}

impl Fetcher {
    /// Create a new fetcher with default settings
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Maximum number of requests per second
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(requests_per_second: u32) -> Result<Self, FetchError> {
        Self::with_config(requests_per_second, 3, Duration::from_secs(30), true)
    }

    /// Create a new fetcher with custom configuration
    ///
    /// Redirects are never followed: the upstream answers 302 when its
    /// session cookie has expired, and the retry loop handles that status
    /// itself so the fresh cookie lands in the store first.
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Maximum number of requests per second
    /// * `max_retries` - Maximum number of retry attempts
    /// * `timeout` - Request timeout duration
    /// * `enable_cookies` - Share a cookie store across requests
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(
        requests_per_second: u32,
        max_retries: u32,
        timeout: Duration,
        enable_cookies: bool,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(enable_cookies)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::new(1).unwrap());
        let quota = Quota::per_second(rate);
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            max_retries,
            base_delay_ms: 1000,
            accept_language: String::from("en-US,en;q=0.9"),
            user_agent: None,
        })
    }

    /// Set the Accept-Language header value
    pub fn set_language(&mut self, language: &str) {
        self.accept_language = format!("{language},en;q=0.8");
    }

    /// Pin a fixed User-Agent instead of rotating through the pool
    pub fn set_user_agent(&mut self, user_agent: String) {
        self.user_agent = Some(user_agent);
    }

    /// GET a URL with query parameters, returning the response body
    ///
    /// Handles rate limiting and retry with exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::MaxRetriesExceeded` after exhausting retries,
    /// or `FetchError::ServerError` for a non-retryable status.
    pub async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;
        self.send_with_retry(url, params, None).await
    }

    /// POST a form body to a URL, returning the response body
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Fetcher::get`].
    pub async fn post_form(
        &self,
        url: &str,
        params: &[(&str, String)],
        body: String,
    ) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;
        self.send_with_retry(url, params, Some(body)).await
    }

    /// Send with exponential backoff retry logic
    async fn send_with_retry(
        &self,
        url: &str,
        params: &[(&str, String)],
        form_body: Option<String>,
    ) -> Result<String, FetchError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay_ms * 2_u64.pow(attempt - 1);
                debug!(url, attempt, delay_ms = delay, "retrying request");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let headers = self.build_headers(form_body.is_some());

            let request = match &form_body {
                Some(body) => self
                    .client
                    .post(url)
                    .query(params)
                    .headers(headers)
                    .body(body.clone()),
                None => self.client.get(url).query(params).headers(headers),
            };

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.text().await?);
                    } else if Self::should_retry(status.as_u16()) {
                        warn!(url, status = status.as_u16(), "retryable status");
                        last_error = Some(FetchError::ServerError(status.as_u16()));
                        continue;
                    }
                    return Err(FetchError::ServerError(status.as_u16()));
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(FetchError::Timeout);
                    } else {
                        last_error = Some(FetchError::Http(e));
                    }
                }
            }
        }

        if let Some(err) = last_error {
            warn!(url, "all retries failed: {err}");
        }
        Err(FetchError::MaxRetriesExceeded)
    }

    /// Determine if a status code should trigger a retry
    ///
    /// Retry on:
    /// - 302 (session cookie expired, a fresh one arrives with the retry)
    /// - 429 (Too Many Requests)
    /// - 500 (Internal Server Error)
    /// - 502 (Bad Gateway)
    /// - 503 (Service Unavailable)
    /// - 504 (Gateway Timeout)
    ///
    /// Don't retry on:
    /// - 400 (Bad Request)
    /// - 401 (Unauthorized)
    /// - 403 (Forbidden)
    /// - 404 (Not Found)
    pub(crate) fn should_retry(status: u16) -> bool {
        matches!(status, 302 | 429 | 500 | 502 | 503 | 504)
            || StatusCode::from_u16(status).map_or(false, |s| s.is_server_error())
    }

    /// Build HTTP headers for trends requests
    fn build_headers(&self, is_form_post: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();

        match &self.user_agent {
            Some(agent) => {
                if let Ok(value) = HeaderValue::from_str(agent) {
                    headers.insert(USER_AGENT, value);
                }
            }
            None => {
                headers.insert(USER_AGENT, HeaderValue::from_static(self.random_user_agent()));
            }
        }

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        if let Ok(value) = HeaderValue::from_str(&self.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }
        headers.insert(
            ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate, br"),
        );

        if is_form_post {
            headers.insert(
                reqwest::header::CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded;charset=UTF-8"),
            );
        }

        headers
    }

    /// Get a random user agent from the pool
    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
    }
}
