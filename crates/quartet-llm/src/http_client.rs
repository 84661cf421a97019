//! Shared HTTP client infrastructure for the provider backends
//!
//! One `reqwest::Client` is configured per process and shared by all four
//! backends, with timeout and retry policies for talking to providers.

use quartet_utils::redaction::redact_error_message;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::LlmError;

/// Default maximum HTTP timeout (5 minutes)
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Default connect timeout (30 seconds)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retry attempts for 5xx and network failures
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Initial backoff duration for retries (1 second)
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Longest provider error body echoed into an error message
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Shared HTTP client for provider backends
///
/// Provides connection reuse, a per-request timeout capped at the client's
/// maximum, and linear-backoff retries for 5xx and network errors. 4xx
/// responses are never retried.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_timeout: Duration,
    max_retries: u32,
    initial_backoff: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, LlmError> {
        Self::with_settings(DEFAULT_MAX_HTTP_TIMEOUT, DEFAULT_MAX_RETRIES)
    }

    /// Create a new HTTP client with a custom maximum timeout and retry count
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn with_settings(max_timeout: Duration, max_retries: u32) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| {
                LlmError::Misconfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_timeout,
            max_retries,
            initial_backoff: INITIAL_BACKOFF,
        })
    }

    /// Shorten the wait between retries; tests use this to stay fast.
    #[must_use]
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Start a POST request on the shared connection pool.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Execute an HTTP request with timeout and retry policy
    ///
    /// - Per-request timeout: `min(request_timeout, max_timeout)`
    /// - Up to `max_retries` retries for 5xx and network failures
    /// - Linear backoff: `initial_backoff * attempt`
    /// - No retries for 4xx errors or timeouts
    ///
    /// # Errors
    ///
    /// - `LlmError::ProviderAuth` for 401/403 errors
    /// - `LlmError::ProviderQuota` for 429 errors
    /// - `LlmError::ProviderOutage` for 5xx errors (after retries)
    /// - `LlmError::Timeout` for timeouts
    /// - `LlmError::Transport` for network errors (after retries) and other 4xx
    pub async fn execute_with_retry(
        &self,
        request_builder: RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        let mut attempt = 0;

        loop {
            attempt += 1;

            let request = request_builder
                .try_clone()
                .ok_or_else(|| {
                    LlmError::Transport("Failed to clone request for retry".to_string())
                })?
                .timeout(effective_timeout)
                .build()
                .map_err(|e| LlmError::Transport(format!("Failed to build request: {}", e)))?;

            debug!(
                provider = provider_name,
                attempt = attempt,
                timeout_secs = effective_timeout.as_secs(),
                "Executing HTTP request"
            );

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_client_error() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(map_client_error(status, provider_name, &body));
                    }

                    if status.is_server_error() {
                        if attempt <= self.max_retries {
                            warn!(
                                provider = provider_name,
                                attempt = attempt,
                                status = status.as_u16(),
                                "Server error, will retry"
                            );
                            tokio::time::sleep(self.initial_backoff * attempt).await;
                            continue;
                        }

                        return Err(LlmError::ProviderOutage(format!(
                            "{} returned server error: {}",
                            provider_name, status
                        )));
                    }

                    return Ok(response);
                }
                Err(e) => {
                    if e.is_timeout() {
                        return Err(LlmError::Timeout {
                            duration: effective_timeout,
                        });
                    }

                    let error = LlmError::Transport(format!(
                        "{} request failed: {}",
                        provider_name,
                        redact_error_message(&e.to_string())
                    ));

                    if attempt <= self.max_retries {
                        warn!(
                            provider = provider_name,
                            attempt = attempt,
                            error = %redact_error_message(&e.to_string()),
                            "Network error, will retry"
                        );
                        tokio::time::sleep(self.initial_backoff * attempt).await;
                        continue;
                    }

                    return Err(error);
                }
            }
        }
    }
}

/// Map HTTP client error status codes to LlmError variants
///
/// - 401/403 → `LlmError::ProviderAuth`
/// - 429 → `LlmError::ProviderQuota`
/// - Other 4xx → `LlmError::Transport`
///
/// A short, redacted excerpt of the provider's error body is appended.
fn map_client_error(status: StatusCode, provider_name: &str, body: &str) -> LlmError {
    let detail = error_excerpt(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderAuth(format!(
            "{} authentication failed: {}{}",
            provider_name, status, detail
        )),
        StatusCode::TOO_MANY_REQUESTS => LlmError::ProviderQuota(format!(
            "{} rate limit exceeded: {}{}",
            provider_name, status, detail
        )),
        _ => LlmError::Transport(format!(
            "{} returned client error: {}{}",
            provider_name, status, detail
        )),
    }
}

fn error_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let excerpt: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!(" ({})", redact_error_message(&excerpt))
}
