//! Shared HTTP plumbing for the completion and review stages.
//!
//! ## Retry Strategy
//!
//! Transport errors, HTTP 429 and 5xx are treated as transient. With
//! `max_retries = 0` (the default) a request is sent exactly once. Otherwise
//! the wait doubles after each attempt: `retry_backoff_ms * 2^(attempt - 1)`.
//! Every other status is returned to the caller on the first attempt.

use crate::error::{ExtractorError, ServiceStage};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Retry settings for one stage.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        backoff_ms: 0,
    };

    fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(2u64.saturating_pow(attempt - 1)))
    }
}

/// Build the shared reqwest client.
pub fn build_client(timeout_secs: u64) -> Result<Client, ExtractorError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractorError::Internal(format!("Failed to build HTTP client: {}", e)))
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send the request produced by `build`, retrying transient failures.
///
/// `build` is called once per attempt because a `RequestBuilder` is
/// consumed by `send`.
pub async fn send_with_retry<F>(
    stage: ServiceStage,
    policy: RetryPolicy,
    build: F,
) -> Result<Response, ExtractorError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let backoff = policy.delay(attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                stage,
                attempt,
                policy.max_retries,
                backoff.as_millis()
            );
            sleep(backoff).await;
        }

        match build().send().await {
            Ok(response) if is_transient(response.status()) && attempt < policy.max_retries => {
                warn!("{}: attempt {} returned {}", stage, attempt + 1, response.status());
            }
            Ok(response) => return Ok(response),
            Err(e) if attempt < policy.max_retries => {
                warn!("{}: attempt {} failed — {}", stage, attempt + 1, e);
            }
            Err(e) => return Err(ExtractorError::service(stage, format!("transport error: {}", e))),
        }
        attempt += 1;
    }
}

/// Read a body for an error message, never failing.
pub async fn error_body(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    (status, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy {
            max_retries: 3,
            backoff_ms: 500,
        };
        assert_eq!(p.delay(1), Duration::from_millis(500));
        assert_eq!(p.delay(2), Duration::from_millis(1000));
        assert_eq!(p.delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn transient_statuses() {
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(!is_transient(StatusCode::BAD_REQUEST));
        assert!(!is_transient(StatusCode::UNAUTHORIZED));
    }
}
