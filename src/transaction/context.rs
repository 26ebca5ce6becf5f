// src/transaction/context.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fs::{FileSystem, RealFileSystem};
use crate::simulation::SimulationMode;

/// Everything an operation needs from its surroundings: the dry-run gate and
/// the filesystem it mutates. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub simulation: SimulationMode,
    pub fs: Arc<dyn FileSystem>,
}

impl ExecutionContext {
    pub fn new(simulation: SimulationMode, fs: Arc<dyn FileSystem>) -> Self {
        Self { simulation, fs }
    }

    /// Real filesystem, simulation seeded from `OPGUARD_DRY_RUN`.
    pub fn from_env() -> Self {
        Self::new(SimulationMode::from_env(), Arc::new(RealFileSystem))
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(SimulationMode::default(), Arc::new(RealFileSystem))
    }
}

/// Per-operation view handed to a [`Step`](super::Step).
///
/// Carries the position of the operation inside its transaction so backup
/// artifacts get names no other operation in this process will reuse.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub exec: ExecutionContext,
    pub transaction_id: u64,
    pub sequence: usize,
}

impl StepContext {
    pub fn new(exec: ExecutionContext, transaction_id: u64, sequence: usize) -> Self {
        Self {
            exec,
            transaction_id,
            sequence,
        }
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.exec.fs.as_ref()
    }

    /// Sibling backup path: `<name>.<pid>-<txn>-<seq>.backup`.
    pub fn backup_path(&self, target: &Path) -> PathBuf {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let backup_name = format!(
            "{name}.{}-{}-{}.backup",
            std::process::id(),
            self.transaction_id,
            self.sequence
        );
        target.with_file_name(backup_name)
    }
}
