// src/combinators/timeout.rs

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::{OpguardError, Result};

/// Race `fut` against a timer of length `duration`.
///
/// If the timer wins, the future is dropped and `OpguardError::Timeout`
/// carrying `duration` is returned. Dropping only stops the work at its next
/// suspension point; anything it already spawned or wrote stays behind, and
/// cleaning that up is the caller's job.
pub async fn with_timeout<F>(duration: Duration, fut: F) -> Result<F::Output>
where
    F: Future,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(output) => Ok(output),
        Err(_elapsed) => {
            warn!(timeout_ms = duration.as_millis() as u64, "operation timed out");
            Err(OpguardError::Timeout(duration))
        }
    }
}
