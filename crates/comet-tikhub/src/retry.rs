//! Retry with doubling back-off for transient `TikHub` failures.

use std::future::Future;
use std::time::Duration;

use crate::error::TikHubError;

/// Timeouts, connection failures, 429 and 5xx are worth another attempt.
/// Everything else (bad JSON, API-level errors, 4xx) is returned as is.
pub(crate) fn is_retriable(err: &TikHubError) -> bool {
    match err {
        TikHubError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status().is_some_and(|s| {
                    s.is_server_error() || s == reqwest::StatusCode::TOO_MANY_REQUESTS
                })
        }
        TikHubError::Api { .. }
        | TikHubError::Deserialize { .. }
        | TikHubError::InvalidConfig(_) => false,
    }
}

/// Runs `operation`, retrying transient errors up to `max_retries` times.
///
/// The delay before retry `n` is `backoff_base_ms * 2^(n-1)`, with up to 25%
/// jitter either way, capped at 30 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, TikHubError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TikHubError>>,
{
    const MAX_DELAY_MS: u64 = 30_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "TikHub transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
