//! The full deployment workflow.
//!
//! Sequences the step operations as checkout → build → verify → deploy →
//! restart → status for one application, strictly in order and fail-fast:
//! the first step to report failure or raise an error marks the run
//! failed and nothing after it executes, except the final status step,
//! which is best-effort observation and can never fail the run.

use std::fmt;
use std::future::Future;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::config::Registry;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::lock::DeployLocks;
use crate::report::StepOutcome;
use crate::steps;

/// Label carried in every run record.
pub const WORKFLOW_NAME: &str = "full-deploy";

/// The six workflow steps, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepName {
    Checkout,
    Build,
    Verify,
    Deploy,
    Restart,
    Status,
}

impl StepName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checkout => "checkout",
            Self::Build => "build",
            Self::Verify => "verify",
            Self::Deploy => "deploy",
            Self::Restart => "restart",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run state; `Running` is only ever observed mid-flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Record of one workflow execution. Ephemeral: built up step by step,
/// returned to the caller, never persisted.
#[derive(Debug, Serialize)]
pub struct WorkflowRun {
    pub application: String,
    pub workflow: &'static str,
    pub started_at: DateTime<Utc>,
    /// Attempted steps only, in execution order; serialized as an ordered
    /// map keyed by step name.
    #[serde(serialize_with = "steps_as_map")]
    pub steps: Vec<(StepName, StepOutcome)>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<StepName>,
    pub duration_secs: f64,
}

fn steps_as_map<S: Serializer>(
    steps: &[(StepName, StepOutcome)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(steps.len()))?;
    for (name, outcome) in steps {
        map.serialize_entry(name, outcome)?;
    }
    map.end()
}

impl WorkflowRun {
    fn new(application: &str) -> Self {
        Self {
            application: application.to_string(),
            workflow: WORKFLOW_NAME,
            started_at: Utc::now(),
            steps: Vec::new(),
            status: RunStatus::Running,
            failed_step: None,
            duration_secs: 0.0,
        }
    }

    /// True when every mutating step succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// The recorded outcome for `name`, if that step was attempted.
    #[must_use]
    pub fn step(&self, name: StepName) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(step, _)| *step == name)
            .map(|(_, outcome)| outcome)
    }

    /// Record `outcome` and decide whether the workflow may continue.
    fn advance(&mut self, name: StepName, outcome: StepOutcome) -> bool {
        let ok = outcome.success();
        self.steps.push((name, outcome));
        if !ok {
            self.status = RunStatus::Failed;
            self.failed_step = Some(name);
            tracing::error!(app = %self.application, step = %name, "workflow step failed");
        }
        ok
    }

    fn finish(mut self, started: Instant) -> Self {
        self.duration_secs = started.elapsed().as_secs_f64();
        if self.status == RunStatus::Running {
            self.status = RunStatus::Completed;
            tracing::info!(app = %self.application, "full deployment workflow completed");
        }
        self
    }
}

/// Fold a step's result into an outcome: reports pass through, errors are
/// absorbed as `{error}` records.
async fn attempt<R, F>(step: F) -> StepOutcome
where
    R: Into<StepOutcome>,
    F: Future<Output = Result<R>>,
{
    match step.await {
        Ok(report) => report.into(),
        Err(e) => StepOutcome::Error {
            error: e.to_string(),
        },
    }
}

/// Execute the full deployment workflow for `application`.
///
/// The access guard and the per-application lock run before step 1, so an
/// unknown application or a concurrent deployment produce an error and no
/// run record; nothing has happened yet in either case. The lease is held
/// until the run reaches a terminal state, whichever that is.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidApplication`] or
/// [`crate::Error::DeploymentInProgress`]; once the sequence starts, all
/// failures live inside the returned [`WorkflowRun`].
pub async fn full_deploy(
    registry: &Registry,
    runner: &impl CommandRunner,
    locks: &DeployLocks,
    application: &str,
) -> Result<WorkflowRun> {
    registry.require_application(application)?;
    let _lease = locks.try_acquire(application)?;

    tracing::info!(app = %application, "full deployment workflow started");
    let started = Instant::now();
    let mut run = WorkflowRun::new(application);

    tracing::info!(step = "1/6", "workflow step: checkout repository");
    let outcome = attempt(steps::checkout(registry, runner, application)).await;
    if !run.advance(StepName::Checkout, outcome) {
        return Ok(run.finish(started));
    }

    tracing::info!(step = "2/6", "workflow step: build application");
    let outcome = attempt(steps::build(registry, runner, application)).await;
    if !run.advance(StepName::Build, outcome) {
        return Ok(run.finish(started));
    }

    tracing::info!(step = "3/6", "workflow step: verify artifact");
    let outcome = attempt(steps::verify(registry, application)).await;
    if !run.advance(StepName::Verify, outcome) {
        return Ok(run.finish(started));
    }

    tracing::info!(step = "4/6", "workflow step: deploy artifact");
    let outcome = attempt(steps::deploy(registry, application)).await;
    if !run.advance(StepName::Deploy, outcome) {
        return Ok(run.finish(started));
    }

    tracing::info!(step = "5/6", "workflow step: restart application");
    let outcome = attempt(steps::restart(registry, runner, application)).await;
    if !run.advance(StepName::Restart, outcome) {
        return Ok(run.finish(started));
    }

    // Best-effort: a failed status query still leaves the run completed.
    tracing::info!(step = "6/6", "workflow step: application status");
    let outcome = attempt(steps::status(registry, runner, application)).await;
    run.steps.push((StepName::Status, outcome));

    Ok(run.finish(started))
}
