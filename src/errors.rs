// src/errors.rs

//! Crate-wide error type, result alias and top-level failure reporting.

use std::time::Duration;

use thiserror::Error;

/// A single failed task inside a [`parallel_map`](crate::combinators::parallel_map)
/// fan-out, keyed by the index of its input item.
#[derive(Debug)]
pub struct TaskFailure {
    pub index: usize,
    pub error: anyhow::Error,
}

#[derive(Error, Debug)]
pub enum OpguardError {
    /// Bad caller input (empty transaction, invalid plan, zero concurrency).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operating on a finalized transaction or on a resource in the wrong state
    /// (e.g. a copy source that does not exist).
    #[error("Resource state error: {0}")]
    ResourceState(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Retries exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("{} of {total} parallel tasks failed", .failures.len())]
    Parallel {
        total: usize,
        failures: Vec<TaskFailure>,
    },

    #[error("Operation '{operation}' failed: {source}")]
    OperationFailed {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unwrapped a failed outcome: {0}")]
    Unwrap(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OpguardError>;

/// Render an error for the process boundary.
///
/// Anticipated failures print their own message. Anything that arrived as an
/// opaque `anyhow::Error` is reported generically unless `debug` is set, in
/// which case the whole cause chain is shown.
pub fn describe_failure(err: &OpguardError, debug: bool) -> String {
    if debug {
        return format!("opguard error: {err:?}");
    }

    match err {
        OpguardError::Other(_) => {
            "opguard error: an unexpected error occurred (re-run with --debug for details)"
                .to_string()
        }
        known => format!("opguard error: {known}"),
    }
}
