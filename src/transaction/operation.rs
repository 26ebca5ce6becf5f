// src/transaction/operation.rs

//! A named, optionally compensable unit of work.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::simulation::Gated;

use super::context::StepContext;

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// The work behind an [`Operation`].
///
/// Implementations keep whatever they need for rollback (backup paths,
/// "created by me" flags) in their own fields: `execute` fills them in,
/// `compensate` reads them. A step that never executed, or that ran under
/// simulation, has nothing recorded and compensates as a no-op.
///
/// Steps perform real effects only; [`Operation`] puts every call behind the
/// simulation gate.
pub trait Step: Send {
    fn execute<'a>(&'a mut self, cx: &'a StepContext) -> StepFuture<'a>;

    fn has_compensator(&self) -> bool {
        false
    }

    /// Whether rollback should also compensate this step when a commit
    /// deadline cut its execute short. Only sound when `compensate` copes
    /// with an execute that never started, stopped part-way, or is still
    /// finishing in the background.
    fn compensates_interrupted(&self) -> bool {
        false
    }

    /// Undo whatever `execute` did.
    fn compensate<'a>(&'a mut self, _cx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async { Ok(()) })
    }

    /// Drop rollback artifacts once the owning transaction has committed.
    fn finalize(&mut self, _cx: &StepContext) -> anyhow::Result<()> {
        Ok(())
    }
}

type BoxedAction = Box<dyn FnMut() -> StepFuture<'static> + Send>;

fn boxed_action<F, Fut>(mut f: F) -> BoxedAction
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move || -> StepFuture<'static> { Box::pin(f()) })
}

/// Step built from caller-supplied closures.
struct FnStep {
    executor: BoxedAction,
    compensator: Option<BoxedAction>,
}

impl Step for FnStep {
    fn execute<'a>(&'a mut self, _cx: &'a StepContext) -> StepFuture<'a> {
        (self.executor)()
    }

    fn has_compensator(&self) -> bool {
        self.compensator.is_some()
    }

    fn compensate<'a>(&'a mut self, _cx: &'a StepContext) -> StepFuture<'a> {
        match self.compensator.as_mut() {
            Some(compensator) => compensator(),
            None => Box::pin(async { Ok(()) }),
        }
    }
}

pub struct Operation {
    description: String,
    step: Box<dyn Step>,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("description", &self.description)
            .field("has_compensator", &self.step.has_compensator())
            .finish_non_exhaustive()
    }
}

impl Operation {
    pub fn new(description: impl Into<String>, step: impl Step + 'static) -> Self {
        Self {
            description: description.into(),
            step: Box::new(step),
        }
    }

    /// Operation with no compensator.
    pub fn from_fn<F, Fut>(description: impl Into<String>, executor: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(
            description,
            FnStep {
                executor: boxed_action(executor),
                compensator: None,
            },
        )
    }

    /// Operation whose effect `compensator` undoes during rollback.
    pub fn compensated<F, FutF, C, FutC>(
        description: impl Into<String>,
        executor: F,
        compensator: C,
    ) -> Self
    where
        F: FnMut() -> FutF + Send + 'static,
        FutF: Future<Output = anyhow::Result<()>> + Send + 'static,
        C: FnMut() -> FutC + Send + 'static,
        FutC: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(
            description,
            FnStep {
                executor: boxed_action(executor),
                compensator: Some(boxed_action(compensator)),
            },
        )
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn has_compensator(&self) -> bool {
        self.step.has_compensator()
    }

    pub fn compensates_interrupted(&self) -> bool {
        self.step.compensates_interrupted()
    }

    /// Run the step through the simulation gate.
    pub async fn execute(&mut self, cx: &StepContext) -> anyhow::Result<Gated<()>> {
        let Self { description, step } = self;
        cx.exec
            .simulation
            .gate(description.as_str(), move || step.execute(cx))
            .await
    }

    pub async fn compensate(&mut self, cx: &StepContext) -> anyhow::Result<()> {
        let label = format!("undo: {}", self.description);
        let step = &mut self.step;
        cx.exec
            .simulation
            .gate_void(&label, move || step.compensate(cx))
            .await
    }

    pub fn finalize(&mut self, cx: &StepContext) -> anyhow::Result<()> {
        let label = format!("clean up: {}", self.description);
        let step = &mut self.step;
        cx.exec
            .simulation
            .gate_sync_void(&label, move || step.finalize(cx))
    }
}
