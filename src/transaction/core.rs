// src/transaction/core.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::combinators::with_timeout;
use crate::errors::{OpguardError, Result};
use crate::outcome::Outcome;
use crate::simulation::Gated;

use super::context::{ExecutionContext, StepContext};
use super::operation::Operation;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// How a single step ended during commit.
enum StepEnd {
    Finished(anyhow::Result<Gated<()>>),
    /// The deadline had already passed; the step never started.
    Skipped,
    /// The deadline passed while the step was running.
    Interrupted,
}

/// Lifecycle of a [`Transaction`]. Moves only `Open -> Committed` or
/// `Open -> RolledBack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// A compensator that failed during rollback. Recorded, never surfaced as
/// the transaction's error.
#[derive(Debug)]
pub struct RollbackFailure {
    pub operation: String,
    pub error: anyhow::Error,
}

/// Ordered, single-use sequence of operations with reverse-order
/// compensation on failure.
///
/// Operations run strictly one after another: step `k + 1` starts only once
/// step `k` has resolved. Nothing serialises two transactions touching the
/// same paths; callers must not run overlapping transactions concurrently.
#[derive(Debug)]
pub struct Transaction {
    id: u64,
    context: ExecutionContext,
    operations: Vec<Operation>,
    /// Number of leading operations whose execute step succeeded.
    completed: usize,
    state: TransactionState,
    rollback_failures: Vec<RollbackFailure>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    /// Transaction on the real filesystem, simulation seeded from the environment.
    pub fn new() -> Self {
        Self::with_context(ExecutionContext::from_env())
    }

    pub fn with_context(context: ExecutionContext) -> Self {
        Self {
            id: NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
            context,
            operations: Vec::new(),
            completed: 0,
            state: TransactionState::Open,
            rollback_failures: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(Operation::description)
    }

    pub fn rollback_failures(&self) -> &[RollbackFailure] {
        &self.rollback_failures
    }

    /// Append an operation. Fails once the transaction has left `Open`.
    pub fn add_operation(&mut self, operation: Operation) -> Result<()> {
        self.ensure_open("add an operation to")?;
        debug!(
            transaction = self.id,
            operation = operation.description(),
            "operation added"
        );
        self.operations.push(operation);
        Ok(())
    }

    /// Execute every operation in insertion order.
    ///
    /// On the first failure the completed operations are rolled back (in
    /// reverse) before returning; the returned failure always describes the
    /// original error, whatever happened during rollback.
    pub async fn commit(&mut self) -> Outcome<()> {
        self.run_commit(None).await
    }

    /// Like [`Transaction::commit`], but the whole sequence must finish
    /// within `limit`.
    ///
    /// When the limit passes, the running step is abandoned and the
    /// transaction rolls back before returning [`OpguardError::Timeout`].
    /// The abandoned step is compensated too if it says it can be (see
    /// [`Step::compensates_interrupted`](super::Step::compensates_interrupted)).
    pub async fn commit_within(&mut self, limit: Duration) -> Outcome<()> {
        self.run_commit(Some(limit)).await
    }

    async fn run_commit(&mut self, limit: Option<Duration>) -> Outcome<()> {
        if let Err(err) = self.ensure_open("commit") {
            return Outcome::failure(err);
        }
        if self.operations.is_empty() {
            return Outcome::failure(OpguardError::Validation(format!(
                "transaction {} has no operations to commit",
                self.id
            )));
        }

        info!(
            transaction = self.id,
            operations = self.operations.len(),
            simulated = self.context.simulation.is_enabled(),
            timeout_ms = limit.map(|l| l.as_millis() as u64),
            "committing transaction"
        );

        let deadline = limit.map(|l| Instant::now() + l);

        for index in 0..self.operations.len() {
            let cx = self.step_context(index);
            let end = {
                let operation = &mut self.operations[index];
                debug!(
                    transaction = self.id,
                    index,
                    operation = operation.description(),
                    "executing operation"
                );
                match deadline {
                    None => StepEnd::Finished(operation.execute(&cx).await),
                    Some(at) => {
                        let remaining = at.saturating_duration_since(Instant::now());
                        if remaining.is_zero() {
                            StepEnd::Skipped
                        } else {
                            match with_timeout(remaining, operation.execute(&cx)).await {
                                Ok(result) => StepEnd::Finished(result),
                                Err(_) => StepEnd::Interrupted,
                            }
                        }
                    }
                }
            };

            let operation = self.operations[index].description().to_string();
            let interrupted = matches!(end, StepEnd::Interrupted);
            match end {
                StepEnd::Finished(Ok(_)) => self.completed = index + 1,
                StepEnd::Finished(Err(source)) => {
                    error!(
                        transaction = self.id,
                        index,
                        operation = %operation,
                        error = %source,
                        "operation failed; rolling back transaction"
                    );
                    self.rollback().await;
                    return Outcome::failure(OpguardError::OperationFailed { operation, source });
                }
                StepEnd::Skipped | StepEnd::Interrupted => {
                    if interrupted && self.operations[index].compensates_interrupted() {
                        self.completed = index + 1;
                    }
                    let limit = limit.unwrap_or_default();
                    error!(
                        transaction = self.id,
                        index,
                        operation = %operation,
                        timeout_ms = limit.as_millis() as u64,
                        "commit deadline passed; rolling back transaction"
                    );
                    self.rollback().await;
                    return Outcome::failure(OpguardError::Timeout(limit));
                }
            }
        }

        self.state = TransactionState::Committed;
        self.finalize_operations();
        info!(transaction = self.id, "transaction committed");
        Outcome::success(())
    }

    /// Compensate every completed operation in reverse order.
    ///
    /// Idempotent. A failing compensator is logged and recorded in
    /// [`Transaction::rollback_failures`], and rollback carries on with the
    /// earlier operations. Has no effect on a committed transaction.
    pub async fn rollback(&mut self) {
        match self.state {
            TransactionState::RolledBack => {
                debug!(transaction = self.id, "transaction already rolled back");
                return;
            }
            TransactionState::Committed => {
                warn!(
                    transaction = self.id,
                    "rollback requested on a committed transaction; ignoring"
                );
                return;
            }
            TransactionState::Open => {}
        }

        info!(
            transaction = self.id,
            completed = self.completed,
            "rolling back transaction"
        );

        for index in (0..self.completed).rev() {
            let cx = self.step_context(index);
            let operation = &mut self.operations[index];
            if !operation.has_compensator() {
                continue;
            }
            if let Err(error) = operation.compensate(&cx).await {
                warn!(
                    transaction = self.id,
                    index,
                    operation = operation.description(),
                    error = %error,
                    "compensation failed; continuing rollback"
                );
                self.rollback_failures.push(RollbackFailure {
                    operation: operation.description().to_string(),
                    error,
                });
            }
        }

        self.completed = 0;
        self.state = TransactionState::RolledBack;
    }

    fn ensure_open(&self, action: &str) -> Result<()> {
        match self.state {
            TransactionState::Open => Ok(()),
            TransactionState::Committed => Err(OpguardError::ResourceState(format!(
                "cannot {action} transaction {}: already committed",
                self.id
            ))),
            TransactionState::RolledBack => Err(OpguardError::ResourceState(format!(
                "cannot {action} transaction {}: already rolled back",
                self.id
            ))),
        }
    }

    fn step_context(&self, sequence: usize) -> StepContext {
        StepContext::new(self.context.clone(), self.id, sequence)
    }

    fn finalize_operations(&mut self) {
        for index in 0..self.operations.len() {
            let cx = self.step_context(index);
            let operation = &mut self.operations[index];
            if let Err(err) = operation.finalize(&cx) {
                warn!(
                    transaction = self.id,
                    operation = operation.description(),
                    error = %err,
                    "failed to clean up after committed operation"
                );
            }
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Open && self.completed > 0 {
            warn!(
                transaction = self.id,
                completed = self.completed,
                "transaction dropped mid-commit; completed operations were not rolled back"
            );
        }
    }
}
