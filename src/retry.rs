//! Retry with exponential backoff for outbound HTTP calls.
//!
//! Every provider request (OpenAI, Pinecone) goes through a [`RetryPolicy`].
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: `base_delay × 2^(attempt-1)`, exponent capped at 5
//!   (1s, 2s, 4s, 8s, 16s, 32s with the default base)

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::warn;

const MAX_BACKOFF_EXPONENT: u32 = 5;

/// Failure of an HTTP call after the retry policy gave up.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{service} returned {status}: {body}")]
    Status {
        service: String,
        status: StatusCode,
        body: String,
    },

    #[error("{service} request failed: {source}")]
    Transport {
        service: String,
        #[source]
        source: reqwest::Error,
    },
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::Transport { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` means a single attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before attempt number `attempt` (1-based retry count).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.base_delay * (1u32 << (attempt - 1).min(MAX_BACKOFF_EXPONENT))
    }

    pub fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    /// Send the request built by `build`, retrying transient failures.
    ///
    /// `build` is called once per attempt since a `RequestBuilder` is
    /// consumed by `send`. Returns the first successful response.
    pub async fn send<F>(&self, service: &str, mut build: F) -> Result<Response, HttpError>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.delay_for(attempt)).await;
            }

            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let body = response.text().await.unwrap_or_default();
                    let err = HttpError::Status {
                        service: service.to_string(),
                        status,
                        body,
                    };

                    // Client error (not 429): don't retry
                    if !Self::is_retryable(status) {
                        return Err(err);
                    }
                    warn!(service, attempt, status = status.as_u16(), "retryable HTTP status");
                    last_err = Some(err);
                }
                Err(e) => {
                    warn!(service, attempt, error = %e, "HTTP transport error");
                    last_err = Some(HttpError::Transport {
                        service: service.to_string(),
                        source: e,
                    });
                }
            }
        }

        // The loop runs at least once, so last_err is always set here.
        Err(last_err.unwrap_or_else(|| HttpError::Status {
            service: service.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "no attempts made".to_string(),
        }))
    }
}
