// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{Plan, RawPlan};
use crate::errors::Result;

/// Read and deserialize a plan file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPlan> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let plan: RawPlan = toml::from_str(&contents)?;

    Ok(plan)
}

/// Read, deserialize and validate a plan file. This is the entry point the
/// rest of the crate uses.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Plan> {
    let raw_plan = load_from_path(&path)?;
    let plan = Plan::try_from(raw_plan)?;
    Ok(plan)
}

/// `Opguard.toml` in the current working directory.
pub fn default_plan_path() -> PathBuf {
    PathBuf::from("Opguard.toml")
}
