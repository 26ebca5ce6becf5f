// src/sync/mod.rs

//! Concurrency gates shared by the combinators.

pub mod semaphore;

pub use semaphore::{Semaphore, SemaphorePermit};
