//! Retry with exponential backoff for feed downloads.

use std::future::Future;
use std::time::Duration;

use crate::error::FeedError;

/// Network failures, 429s and 5xx responses are worth another try; parse
/// errors and other statuses are not.
fn is_retriable(err: &FeedError) -> bool {
    match err {
        FeedError::RateLimited { .. } | FeedError::Http(_) => true,
        FeedError::UnexpectedStatus { status, .. } => *status >= 500,
        FeedError::Xml(_) => false,
    }
}

/// Executes `operation`, retrying retriable errors up to `max_retries` more
/// times with a delay of `backoff_base_ms * 2^attempt`.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, FeedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_ms = backoff_base_ms.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms,
            error = %err,
            "transient feed error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        attempt += 1;
    }
}
