//! Bounded retry with exponential backoff for dependent writes.
//!
//! Event types are fetched independently, so an event can arrive before the
//! rows it references have been materialized by another tracker. Handlers
//! surface that condition as a retryable error and this executor waits for
//! the dependency with a capped exponential backoff before giving up.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::{IndexerError, IndexerResult};

/// Policy controlling the retry executor's backoff schedule.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial one.
    pub max_retries: u32,
    /// Delay before the first retry. Doubled on every subsequent attempt.
    pub initial_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Returns the backoff delay for the given zero-based attempt.
    ///
    /// The delay grows as `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let doubled = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        doubled.min(self.max_delay)
    }
}

/// Default policy used by every handler: 5 retries, 1 s initial delay, 10 s
/// cap, i.e. roughly 25 s of waiting in the worst case.
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl From<indexer_config::shared::RetryConfig> for RetryPolicy {
    fn from(config: indexer_config::shared::RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Runs `operation`, retrying with exponential backoff while `is_retryable`
/// accepts the returned error.
///
/// The operation runs once unconditionally. On failure, a non-retryable error
/// propagates immediately; a retryable one consumes one of
/// [`RetryPolicy::max_retries`] attempts after sleeping the backoff delay.
/// Once the budget is exhausted the final error propagates to the caller
/// unchanged.
pub async fn execute_with_retry<T, F, Fut, P>(
    mut operation: F,
    is_retryable: P,
    policy: RetryPolicy,
) -> IndexerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = IndexerResult<T>>,
    P: Fn(&IndexerError) -> bool,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }

                let delay = policy.delay_for(attempt);
                attempt += 1;

                debug!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "retryable failure, backing off before next attempt"
                );

                sleep(delay).await;
            }
        }
    }
}
