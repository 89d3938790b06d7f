//! Politeness controls for the crawl.
//!
//! [`Pacer`] enforces the minimum interval between consecutive network-facing
//! operations (listing renders and detail-page opens). [`retry_with_backoff`]
//! retries a single fetch on transient failures; non-retriable errors are
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::TransportError;

/// Enforces a fixed minimum interval between successive operations.
///
/// The first call to [`Pacer::wait`] returns immediately; each later call
/// sleeps until `min_interval` has elapsed since the previous one returned.
/// Built on `tokio::time`, so tests can drive it with a paused clock.
#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Sleep until the next operation is allowed, then claim the slot.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let ready_at = last + self.min_interval;
            if ready_at > Instant::now() {
                tracing::trace!(
                    delay_ms = (ready_at - Instant::now()).as_millis(),
                    "pacing before next request"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

/// Returns `true` if `err` is transient and worth another attempt.
///
/// Retriable: network failures, HTTP 429, and 5xx statuses. Everything else
/// (404, other 4xx, challenge pages, bad URLs, context errors) would fail the
/// same way again.
fn is_retriable(err: &TransportError) -> bool {
    match err {
        TransportError::Http(_) | TransportError::RateLimited { .. } => true,
        TransportError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// On a retriable error the function sleeps for `backoff_base_secs * 2^attempt`
/// seconds and tries again, up to `max_retries` additional attempts after the
/// first. With `max_retries = 2` the operation runs at most 3 times.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
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

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
