#![allow(dead_code)]

use std::path::PathBuf;

use opguard::config::{OpSpec, Plan, PlanSettings, RawPlan, RetrySettings};

/// Builder for `Plan` to simplify test setup.
pub struct PlanBuilder {
    plan: RawPlan,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlan {
                config: PlanSettings::default(),
                retry: RetrySettings::default(),
                ops: Vec::new(),
            },
        }
    }

    pub fn mkdir(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan.ops.push(OpSpec::Mkdir { path: path.into() });
        self
    }

    pub fn write(mut self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.plan.ops.push(OpSpec::Write {
            path: path.into(),
            content: content.to_string(),
        });
        self
    }

    pub fn delete(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan.ops.push(OpSpec::Delete { path: path.into() });
        self
    }

    pub fn copy(mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        self.plan.ops.push(OpSpec::Copy {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn dry_run(mut self, val: bool) -> Self {
        self.plan.config.dry_run = val;
        self
    }

    pub fn concurrency(mut self, val: usize) -> Self {
        self.plan.config.concurrency = val;
        self
    }

    pub fn timeout_ms(mut self, val: u64) -> Self {
        self.plan.config.timeout_ms = val;
        self
    }

    pub fn retries(mut self, max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.plan.retry = RetrySettings {
            max_retries,
            initial_delay_ms,
            max_delay_ms,
        };
        self
    }

    pub fn raw(self) -> RawPlan {
        self.plan
    }

    pub fn build(self) -> Plan {
        Plan::try_from(self.plan).expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}
