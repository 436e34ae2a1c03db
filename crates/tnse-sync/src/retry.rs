//! Timeout, retry and jittered backoff for API calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Default number of attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default timeout of the first attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default base delay between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

/// Retry policy applied to every upstream call.
///
/// Attempt `k` (1-based) runs under a timeout of `k × timeout`. After a
/// failed attempt with attempts remaining the policy sleeps for the current
/// delay, then grows it by `delay + random(0..=delay)`.
/// Only API, transport and timeout errors are retried; authentication and
/// decode errors are returned immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least 1).
    pub max_attempts: u32,
    /// Timeout of the first attempt.
    pub timeout: Duration,
    /// Base delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    pub fn new(max_attempts: u32, timeout: Duration, delay: Duration) -> Self {
        Self {
            max_attempts,
            timeout,
            delay,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or attempts run out.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Auth`] or [`ApiError::Decode`] from the first attempt that reports it
    /// - [`ApiError::Exhausted`] wrapping the last error when every attempt failed
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delay = self.delay;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let timeout = self.timeout.saturating_mul(attempt);

            let err = match tokio::time::timeout(timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if !e.is_transient() => return Err(e),
                Ok(Err(e)) => {
                    debug!("{}: API error ({})", operation, e);
                    e
                },
                Err(_) => {
                    debug!("{}: timed out after {:?}", operation, timeout);
                    ApiError::Timeout {
                        seconds: timeout.as_secs(),
                    }
                },
            };

            if attempt >= max_attempts {
                return Err(ApiError::Exhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            warn!(
                "Attempt {}/{}. Wait {:?} and try again",
                attempt, max_attempts, delay
            );
            metrics::counter!("tnse_api_retries_total", "operation" => operation.to_string())
                .increment(1);

            tokio::time::sleep(delay).await;
            delay = delay + self.delay + jitter(self.delay);
        }
    }
}

/// Returns a random duration in `0..=max`, millisecond resolution.
fn jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}
