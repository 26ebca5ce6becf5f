// src/combinators/retry.rs

//! Retry with capped exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::{OpguardError, Result};

/// Backoff parameters.
///
/// The delay before retry `n` (1-based) is
/// `min(initial_delay * 2^(n-1), max_delay)`. No jitter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// Delay slept after the `attempt`-th failure (attempts count from 1).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        match 1u32.checked_shl(exponent) {
            Some(factor) => self.initial_delay.saturating_mul(factor).min(self.max_delay),
            None => self.max_delay,
        }
    }
}

/// Run `op` until it succeeds or `policy.max_retries` retries are used up.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display + Into<anyhow::Error>,
{
    retry_with(policy, op, |_, _| {}).await
}

/// Like [`retry`], calling `on_retry(attempt, &error)` before each backoff
/// sleep. An operation that keeps failing sees exactly `max_retries`
/// callbacks before the final [`OpguardError::RetryExhausted`].
pub async fn retry_with<T, E, F, Fut, R>(policy: &RetryPolicy, mut op: F, mut on_retry: R) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display + Into<anyhow::Error>,
    R: FnMut(u32, &E),
{
    let mut attempt: u32 = 0;

    loop {
        let err = match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(retries = attempt, "operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        attempt += 1;
        if attempt > policy.max_retries {
            warn!(attempts = attempt, error = %err, "retries exhausted");
            return Err(OpguardError::RetryExhausted {
                attempts: attempt,
                source: err.into(),
            });
        }

        let delay = policy.delay_for_attempt(attempt);
        warn!(
            attempt,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "operation failed; retrying"
        );
        on_retry(attempt, &err);
        tokio::time::sleep(delay).await;
    }
}
