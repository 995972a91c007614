//! The engine facade handed to front-ends.
//!
//! Bundles the registry, the command runner, and the lock table behind
//! one narrow surface so the tool and HTTP layers stay protocol-only.
//! Generic over [`CommandRunner`] so front-end tests can drive the whole
//! engine with a stub.

use std::time::Duration;

use crate::config::{ConfigurationView, Registry};
use crate::error::Result;
use crate::exec::{CommandRunner, TokioCommandRunner};
use crate::lock::DeployLocks;
use crate::report::{
    BuildReport, CheckoutReport, DeployReport, LogsReport, ServiceReport, StatusReport,
    VerifyReport,
};
use crate::steps;
use crate::workflow::{self, WorkflowRun};

/// One deployment engine instance: registry + runner + locks.
pub struct Deployer<R = TokioCommandRunner> {
    registry: Registry,
    runner: R,
    locks: DeployLocks,
}

impl Deployer<TokioCommandRunner> {
    /// Production engine with the tokio runner at the given command
    /// timeout.
    #[must_use]
    pub fn new(registry: Registry, command_timeout: Duration) -> Self {
        Self::with_runner(registry, TokioCommandRunner::new(command_timeout))
    }
}

impl<R: CommandRunner> Deployer<R> {
    #[must_use]
    pub fn with_runner(registry: Registry, runner: R) -> Self {
        Self {
            registry,
            runner,
            locks: DeployLocks::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registry snapshot for the configuration endpoints.
    #[must_use]
    pub fn configuration(&self) -> ConfigurationView {
        self.registry.configuration()
    }

    /// # Errors
    ///
    /// See [`steps::checkout`].
    pub async fn checkout(&self, application: &str) -> Result<CheckoutReport> {
        steps::checkout(&self.registry, &self.runner, application).await
    }

    /// # Errors
    ///
    /// See [`steps::build`].
    pub async fn build(&self, application: &str) -> Result<BuildReport> {
        steps::build(&self.registry, &self.runner, application).await
    }

    /// # Errors
    ///
    /// See [`steps::verify`].
    pub async fn verify(&self, application: &str) -> Result<VerifyReport> {
        steps::verify(&self.registry, application).await
    }

    /// # Errors
    ///
    /// See [`steps::deploy`].
    pub async fn deploy(&self, application: &str) -> Result<DeployReport> {
        steps::deploy(&self.registry, application).await
    }

    /// # Errors
    ///
    /// See [`steps::restart`].
    pub async fn restart(&self, application: &str) -> Result<ServiceReport> {
        steps::restart(&self.registry, &self.runner, application).await
    }

    /// # Errors
    ///
    /// See [`steps::stop`].
    pub async fn stop(&self, application: &str) -> Result<ServiceReport> {
        steps::stop(&self.registry, &self.runner, application).await
    }

    /// # Errors
    ///
    /// See [`steps::status`].
    pub async fn status(&self, application: &str) -> Result<StatusReport> {
        steps::status(&self.registry, &self.runner, application).await
    }

    /// # Errors
    ///
    /// See [`steps::recent_logs`].
    pub async fn recent_logs(&self, application: &str, lines: u32) -> Result<LogsReport> {
        steps::recent_logs(&self.registry, &self.runner, application, lines).await
    }

    /// # Errors
    ///
    /// See [`workflow::full_deploy`].
    pub async fn full_deploy(&self, application: &str) -> Result<WorkflowRun> {
        workflow::full_deploy(&self.registry, &self.runner, &self.locks, application).await
    }

    /// Direct access to the runner, for host-level queries that are not
    /// tied to a registered application.
    pub fn runner(&self) -> &R {
        &self.runner
    }
}
