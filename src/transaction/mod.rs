// src/transaction/mod.rs

//! Transactions of compensable operations.
//!
//! - [`operation`]: the `Step` trait and the `Operation` wrapper that routes
//!   every step call through the simulation gate.
//! - [`core`]: the `Transaction` state machine (commit, reverse-order rollback).
//! - [`fs_ops`]: write / create-directory / delete / copy factories.
//! - [`context`]: the execution context (simulation + filesystem) threaded
//!   into every operation.

pub mod context;
pub mod core;
pub mod fs_ops;
pub mod operation;

pub use context::{ExecutionContext, StepContext};
pub use core::{RollbackFailure, Transaction, TransactionState};
pub use fs_ops::{copy_file, create_directory, delete_file, write_file};
pub use operation::{Operation, Step, StepFuture};
