// src/config/mod.rs

//! Plan files: the TOML description of a transaction the CLI applies.
//!
//! - `model.rs`: the serde data model.
//! - `loader.rs`: reading a plan from disk.
//! - `validate.rs`: semantic checks, via `Plan::try_from(RawPlan)`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_plan_path, load_and_validate, load_from_path};
pub use model::{OpSpec, Plan, PlanSettings, RawPlan, RetrySettings};
