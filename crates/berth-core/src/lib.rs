//! Deployment engine for a fixed registry of applications.
//!
//! Everything flows through a small set of validated operations: source
//! checkout, build, artifact verification, atomic-swap deploy, and
//! service control, composed into a fail-fast six-step workflow. The
//! registry is the sole authority on what may be deployed; the command
//! executor is the sole place child processes are spawned.
//!
//! This crate contains no network code. Front-ends live elsewhere and
//! talk to the engine exclusively through [`Deployer`].

pub mod artifact;
pub mod config;
pub mod deployer;
pub mod error;
pub mod exec;
pub mod lock;
pub mod report;
pub mod steps;
pub mod workflow;

pub use config::{AppDescriptor, BuildKind, ConfigurationView, Registry};
pub use deployer::Deployer;
pub use error::{Error, Result};
pub use exec::{CommandOutput, CommandRunner, TokioCommandRunner, DEFAULT_COMMAND_TIMEOUT};
pub use lock::{DeployLease, DeployLocks};
pub use report::{
    BuildReport, CheckoutReport, DeployReport, LogsReport, ServiceReport, StatusReport,
    StepOutcome, VerifyReport,
};
pub use workflow::{RunStatus, StepName, WorkflowRun, WORKFLOW_NAME};
