// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::combinators::RetryPolicy;

/// A plan file: the list of file operations to apply as one transaction.
///
/// ```toml
/// [config]
/// dry_run = false
/// concurrency = 4
/// timeout_ms = 30000
///
/// [retry]
/// max_retries = 2
/// initial_delay_ms = 200
/// max_delay_ms = 5000
///
/// [[op]]
/// kind = "mkdir"
/// path = "out"
///
/// [[op]]
/// kind = "write"
/// path = "out/a.txt"
/// content = "hi"
/// ```
///
/// Only `[[op]]` is required; both tables default.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlan {
    #[serde(default)]
    pub config: PlanSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default, rename = "op")]
    pub ops: Vec<OpSpec>,
}

/// A plan that passed validation. Built via `Plan::try_from(RawPlan)`.
#[derive(Debug, Clone)]
pub struct Plan {
    pub config: PlanSettings,
    pub retry: RetrySettings,
    pub ops: Vec<OpSpec>,
}

impl Plan {
    pub(crate) fn new_unchecked(config: PlanSettings, retry: RetrySettings, ops: Vec<OpSpec>) -> Self {
        Self { config, retry, ops }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanSettings {
    /// Simulate instead of touching the filesystem.
    #[serde(default)]
    pub dry_run: bool,

    /// How many targets are verified at once after a real commit.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Upper bound for a single commit attempt.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: default_concurrency(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl PlanSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// `[retry]` section. With the default `max_retries = 0` a failed commit is
/// reported immediately.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// One `[[op]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OpSpec {
    Mkdir { path: PathBuf },
    Write { path: PathBuf, content: String },
    Delete { path: PathBuf },
    Copy { from: PathBuf, to: PathBuf },
}

impl OpSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            OpSpec::Mkdir { .. } => "mkdir",
            OpSpec::Write { .. } => "write",
            OpSpec::Delete { .. } => "delete",
            OpSpec::Copy { .. } => "copy",
        }
    }
}
