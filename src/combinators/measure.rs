// src/combinators/measure.rs

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Await `fut` and report how long it took.
pub async fn measure_time<F>(fut: F) -> (F::Output, Duration)
where
    F: Future,
{
    let started = Instant::now();
    let output = fut.await;
    let elapsed = started.elapsed();
    debug!(elapsed_ms = elapsed.as_millis() as u64, "measured operation finished");
    (output, elapsed)
}

/// Await `fut`, hand the elapsed time to `on_complete`, and return the output.
pub async fn measure_time_with<F, C>(fut: F, on_complete: C) -> F::Output
where
    F: Future,
    C: FnOnce(Duration),
{
    let (output, elapsed) = measure_time(fut).await;
    on_complete(elapsed);
    output
}
