// src/combinators/parallel.rs

//! Bounded parallel map.

use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, warn};

use crate::errors::{OpguardError, Result, TaskFailure};
use crate::sync::Semaphore;

/// Apply `op` to every item with at most `concurrency` calls in flight.
///
/// Every item gets its own Tokio task up front; a shared [`Semaphore`]
/// throttles how many of them run `op` at once, and the permit is released on
/// every exit path (success, error, panic). Output order matches input order.
///
/// All tasks are always allowed to settle. If any of them failed (or
/// panicked), the call returns [`OpguardError::Parallel`] listing every
/// failing index, and no partial results.
pub async fn parallel_map<I, T, F, Fut>(items: Vec<I>, concurrency: usize, op: F) -> Result<Vec<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    if concurrency == 0 {
        return Err(OpguardError::Validation(
            "parallel_map concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    let total = items.len();
    debug!(total, concurrency, "parallel_map scheduling tasks");

    let semaphore = Semaphore::new(concurrency);
    let op = Arc::new(op);

    let handles: Vec<_> = items
        .into_iter()
        .map(|item| {
            let semaphore = semaphore.clone();
            let op = Arc::clone(&op);
            tokio::spawn(async move {
                let _permit = semaphore.acquire().await;
                op(item).await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(error)) => failures.push(TaskFailure { index, error }),
            Err(join_err) => failures.push(TaskFailure {
                index,
                error: anyhow!("task panicked or was aborted: {join_err}"),
            }),
        }
    }

    if failures.is_empty() {
        Ok(results)
    } else {
        warn!(total, failed = failures.len(), "parallel_map finished with failures");
        Err(OpguardError::Parallel { total, failures })
    }
}
