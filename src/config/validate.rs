// src/config/validate.rs

use std::path::Path;

use crate::config::model::{OpSpec, Plan, RawPlan};
use crate::errors::{OpguardError, Result};

impl TryFrom<RawPlan> for Plan {
    type Error = crate::errors::OpguardError;

    fn try_from(raw: RawPlan) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(Plan::new_unchecked(raw.config, raw.retry, raw.ops))
    }
}

fn validate_raw_plan(plan: &RawPlan) -> Result<()> {
    ensure_has_ops(plan)?;
    validate_settings(plan)?;
    validate_ops(plan)?;
    Ok(())
}

fn ensure_has_ops(plan: &RawPlan) -> Result<()> {
    if plan.ops.is_empty() {
        return Err(OpguardError::Validation(
            "plan must contain at least one [[op]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_settings(plan: &RawPlan) -> Result<()> {
    if plan.config.concurrency == 0 {
        return Err(OpguardError::Validation(
            "[config].concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    if plan.config.timeout_ms == 0 {
        return Err(OpguardError::Validation(
            "[config].timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if plan.retry.max_delay_ms < plan.retry.initial_delay_ms {
        return Err(OpguardError::Validation(format!(
            "[retry].max_delay_ms ({}) must be >= initial_delay_ms ({})",
            plan.retry.max_delay_ms, plan.retry.initial_delay_ms
        )));
    }

    Ok(())
}

fn validate_ops(plan: &RawPlan) -> Result<()> {
    for (index, op) in plan.ops.iter().enumerate() {
        match op {
            OpSpec::Mkdir { path } | OpSpec::Write { path, .. } | OpSpec::Delete { path } => {
                ensure_path(index, op.kind(), "path", path)?;
            }
            OpSpec::Copy { from, to } => {
                ensure_path(index, op.kind(), "from", from)?;
                ensure_path(index, op.kind(), "to", to)?;
                if from == to {
                    return Err(OpguardError::Validation(format!(
                        "op #{index} (copy): source and destination are both {:?}",
                        from
                    )));
                }
            }
        }
    }
    Ok(())
}

fn ensure_path(index: usize, kind: &str, field: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(OpguardError::Validation(format!(
            "op #{index} ({kind}): `{field}` must not be empty"
        )));
    }
    Ok(())
}
