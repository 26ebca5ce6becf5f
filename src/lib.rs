// src/lib.rs

pub mod cli;
pub mod combinators;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod outcome;
pub mod simulation;
pub mod sync;
pub mod transaction;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::combinators::{measure_time, parallel_map, retry_with};
use crate::config::loader::load_and_validate;
use crate::config::model::{OpSpec, Plan};
use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::simulation::SimulationMode;
use crate::transaction::{
    copy_file, create_directory, delete_file, write_file, ExecutionContext, Operation,
    Transaction,
};

pub use crate::outcome::Outcome;
pub use crate::sync::Semaphore;

/// What applying a plan did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub operations: usize,
    pub simulated: bool,
    /// Written files whose on-disk content was checked after commit.
    pub verified: usize,
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.simulated {
            write!(
                f,
                "[dry-run] simulated {} operations in {}ms",
                self.operations,
                self.elapsed.as_millis()
            )
        } else {
            write!(
                f,
                "applied {} operations ({} verified) in {}ms",
                self.operations,
                self.verified,
                self.elapsed.as_millis()
            )
        }
    }
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading
/// - the simulation switch (flag, plan setting, environment)
/// - a retried, time-limited transaction commit
/// - post-commit verification
pub async fn run(args: CliArgs) -> Result<()> {
    let plan_path = PathBuf::from(&args.plan);
    let plan = load_and_validate(&plan_path)?;

    if args.check {
        print_plan(&plan);
        return Ok(());
    }

    let simulation = SimulationMode::from_env();
    if args.dry_run || plan.config.dry_run {
        simulation.enable();
    }

    let context = ExecutionContext::new(simulation, Arc::new(RealFileSystem));
    let root = plan_root_dir(&plan_path);

    let summary = apply_plan(&plan, &context, &root).await?;
    println!("{summary}");
    Ok(())
}

/// Apply every op in `plan` as a single transaction.
///
/// Relative paths resolve against `root`. Each attempt commits a fresh
/// [`Transaction`] that must finish within `[config].timeout_ms`; an attempt
/// that fails or runs out of time has already rolled back, so retrying per
/// `[retry]` starts from the original state. With `max_retries = 0` the
/// attempt's own error is returned unwrapped.
pub async fn apply_plan(plan: &Plan, context: &ExecutionContext, root: &Path) -> Result<RunSummary> {
    let ops: Vec<OpSpec> = plan.ops.iter().map(|op| resolve_op(op, root)).collect();
    let policy = plan.retry.policy();
    let timeout = plan.config.timeout();

    let attempt = || commit_ops(ops.clone(), context.clone(), timeout);
    let on_retry = |attempt: u32, err: &errors::OpguardError| {
        info!(attempt, error = %err, "plan commit failed; will retry");
    };

    let (committed, elapsed) = if policy.max_retries == 0 {
        measure_time(attempt()).await
    } else {
        measure_time(retry_with(&policy, attempt, on_retry)).await
    };
    committed?;

    let simulated = context.simulation.is_enabled();
    let verified = if simulated {
        0
    } else {
        verify_writes(&ops, context, plan.config.concurrency).await?
    };

    Ok(RunSummary {
        operations: ops.len(),
        simulated,
        verified,
        elapsed,
    })
}

async fn commit_ops(ops: Vec<OpSpec>, context: ExecutionContext, timeout: Duration) -> Result<()> {
    let mut transaction = Transaction::with_context(context);
    for op in ops {
        transaction.add_operation(build_operation(op))?;
    }
    transaction.commit_within(timeout).await.into_result()
}

fn build_operation(op: OpSpec) -> Operation {
    match op {
        OpSpec::Mkdir { path } => create_directory(path),
        OpSpec::Write { path, content } => write_file(path, content),
        OpSpec::Delete { path } => delete_file(path),
        OpSpec::Copy { from, to } => copy_file(from, to),
    }
}

/// Re-read every file whose final content the plan fully determines.
async fn verify_writes(ops: &[OpSpec], context: &ExecutionContext, concurrency: usize) -> Result<usize> {
    let mut expected: BTreeMap<PathBuf, Vec<u8>> = BTreeMap::new();
    for op in ops {
        match op {
            OpSpec::Write { path, content } => {
                expected.insert(path.clone(), content.clone().into_bytes());
            }
            OpSpec::Delete { path } | OpSpec::Copy { to: path, .. } => {
                expected.remove(path);
            }
            OpSpec::Mkdir { .. } => {}
        }
    }

    debug!(files = expected.len(), concurrency, "verifying committed writes");

    let fs = Arc::clone(&context.fs);
    let checked = parallel_map(
        expected.into_iter().collect(),
        concurrency,
        move |(path, content): (PathBuf, Vec<u8>)| {
            let fs = Arc::clone(&fs);
            async move {
                let on_disk = {
                    let fs = Arc::clone(&fs);
                    let path = path.clone();
                    tokio::task::spawn_blocking(move || fs.read(&path)).await??
                };
                if on_disk != content {
                    bail!("{} does not hold the committed content", path.display());
                }
                Ok(path)
            }
        },
    )
    .await?;

    Ok(checked.len())
}

fn resolve_op(op: &OpSpec, root: &Path) -> OpSpec {
    let resolve = |p: &Path| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            root.join(p)
        }
    };

    match op {
        OpSpec::Mkdir { path } => OpSpec::Mkdir { path: resolve(path) },
        OpSpec::Write { path, content } => OpSpec::Write {
            path: resolve(path),
            content: content.clone(),
        },
        OpSpec::Delete { path } => OpSpec::Delete { path: resolve(path) },
        OpSpec::Copy { from, to } => OpSpec::Copy {
            from: resolve(from),
            to: resolve(to),
        },
    }
}

/// Directory that relative plan paths are resolved against.
///
/// - If the plan path has a non-empty parent (e.g. "plans/Opguard.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Opguard.toml" (parent = ""),
///   we fall back to the current working directory "."
pub fn plan_root_dir(plan_path: &Path) -> PathBuf {
    match plan_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// `--check` output: settings and the ordered op list.
fn print_plan(plan: &Plan) {
    println!("opguard check");
    println!("  config.dry_run = {}", plan.config.dry_run);
    println!("  config.concurrency = {}", plan.config.concurrency);
    println!("  config.timeout_ms = {}", plan.config.timeout_ms);
    println!(
        "  retry = {} retries, {}ms..{}ms",
        plan.retry.max_retries, plan.retry.initial_delay_ms, plan.retry.max_delay_ms
    );
    println!();

    println!("ops ({}):", plan.ops.len());
    for (index, op) in plan.ops.iter().enumerate() {
        match op {
            OpSpec::Mkdir { path } => println!("  {index}. mkdir {}", path.display()),
            OpSpec::Write { path, content } => {
                println!("  {index}. write {} ({} bytes)", path.display(), content.len())
            }
            OpSpec::Delete { path } => println!("  {index}. delete {}", path.display()),
            OpSpec::Copy { from, to } => {
                println!("  {index}. copy {} -> {}", from.display(), to.display())
            }
        }
    }

    debug!("check complete (no execution)");
}
