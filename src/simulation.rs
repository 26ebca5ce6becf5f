// src/simulation.rs

//! Dry-run gate.
//!
//! Every side-effecting call in the crate goes through one of the four gate
//! shapes on [`SimulationMode`]. When simulation is enabled the gate logs the
//! description and reports [`Gated::Simulated`] instead of running anything;
//! otherwise it runs the operation and hands its outcome back unchanged. Real
//! and simulated runs therefore share the same control flow.
//!
//! The mode is a value passed around through
//! [`ExecutionContext`](crate::transaction::ExecutionContext), not a global.
//! [`SimulationMode::from_env`] seeds it from `OPGUARD_DRY_RUN` at the
//! process boundary. Clones share one flag, so `enable`/`disable` take effect
//! on the next gated call for every holder.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

/// Environment variable consulted by [`SimulationMode::from_env`].
pub const DRY_RUN_ENV: &str = "OPGUARD_DRY_RUN";

/// Result of a gated call that produces a value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Gated<T> {
    /// The operation ran and produced this value.
    Executed(T),
    /// Simulation was on; nothing ran.
    Simulated,
}

impl<T> Gated<T> {
    pub fn is_simulated(&self) -> bool {
        matches!(self, Gated::Simulated)
    }

    pub fn executed(self) -> Option<T> {
        match self {
            Gated::Executed(value) => Some(value),
            Gated::Simulated => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationMode {
    enabled: Arc<AtomicBool>,
}

impl SimulationMode {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    /// Seed from `OPGUARD_DRY_RUN`; unset or unrecognised values mean disabled.
    pub fn from_env() -> Self {
        let enabled = std::env::var(DRY_RUN_ENV)
            .ok()
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        Self::new(enabled)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        debug!("simulation mode enabled");
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        debug!("simulation mode disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Async operation producing a value.
    pub async fn gate<T, E, F, Fut>(&self, description: &str, op: F) -> Result<Gated<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.simulate(description) {
            return Ok(Gated::Simulated);
        }
        op().await.map(Gated::Executed)
    }

    /// Async operation with no value.
    pub async fn gate_void<E, F, Fut>(&self, description: &str, op: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        if self.simulate(description) {
            return Ok(());
        }
        op().await
    }

    /// Blocking operation producing a value.
    pub fn gate_sync<T, E, F>(&self, description: &str, op: F) -> Result<Gated<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if self.simulate(description) {
            return Ok(Gated::Simulated);
        }
        op().map(Gated::Executed)
    }

    /// Blocking operation with no value.
    pub fn gate_sync_void<E, F>(&self, description: &str, op: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<(), E>,
    {
        if self.simulate(description) {
            return Ok(());
        }
        op()
    }

    fn simulate(&self, description: &str) -> bool {
        if self.is_enabled() {
            info!(target: "opguard::simulation", "[dry-run] {description}");
            true
        } else {
            false
        }
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
