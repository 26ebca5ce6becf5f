// src/combinators/mod.rs

//! Stateless combinators for running fallible async work.
//!
//! - [`retry`]: exponential backoff around a repeatable operation.
//! - [`timeout`]: race an operation against a timer.
//! - [`parallel`]: bounded fan-out over a list of inputs, order preserving.
//! - [`measure`]: wall-clock timing of a single await.
//!
//! None of these share state with transactions.

pub mod measure;
pub mod parallel;
pub mod retry;
pub mod timeout;

pub use measure::{measure_time, measure_time_with};
pub use parallel::parallel_map;
pub use retry::{retry, retry_with, RetryPolicy};
pub use timeout::with_timeout;
