//! Service manager interactions for an application's unit.
//!
//! All of these check the application AND the service allow-list before
//! touching systemd; a registered application whose unit fell off the
//! allow-list is still refused.

use crate::config::Registry;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::report::{LogsReport, ServiceReport, StatusReport};

/// Restart the application's service unit.
///
/// # Errors
///
/// Returns an error for an unknown application, a unit outside the
/// allow-list, or a systemctl that cannot be launched.
pub async fn restart(
    registry: &Registry,
    runner: &impl CommandRunner,
    application: &str,
) -> Result<ServiceReport> {
    service_action(registry, runner, application, "restart").await
}

/// Stop the application's service unit.
///
/// # Errors
///
/// Same failure modes as [`restart`].
pub async fn stop(
    registry: &Registry,
    runner: &impl CommandRunner,
    application: &str,
) -> Result<ServiceReport> {
    service_action(registry, runner, application, "stop").await
}

async fn service_action(
    registry: &Registry,
    runner: &impl CommandRunner,
    application: &str,
    action: &str,
) -> Result<ServiceReport> {
    let descriptor = registry.require_application(application)?;
    let service = descriptor.service_name.clone();
    registry.require_service(&service)?;
    tracing::info!(app = %application, service = %service, action, "driving service unit");

    let details = runner.run(&["systemctl", action, &service], None).await?;
    if details.success() {
        tracing::info!(service = %service, action, "service action succeeded");
    } else {
        tracing::warn!(service = %service, action, exit_code = details.exit_code, "service action failed");
    }
    Ok(ServiceReport::from_output(service, details))
}

/// Query the unit's status. The raw systemctl output is the answer; a
/// non-zero exit (unit inactive, unit failed) is not a failure of this
/// operation.
///
/// # Errors
///
/// Guard failures and launch failures only.
pub async fn status(
    registry: &Registry,
    runner: &impl CommandRunner,
    application: &str,
) -> Result<StatusReport> {
    let descriptor = registry.require_application(application)?;
    let service = descriptor.service_name.clone();
    registry.require_service(&service)?;
    tracing::debug!(service = %service, "fetching unit status");

    let status = runner
        .run(&["systemctl", "status", &service, "--no-pager"], None)
        .await?;
    Ok(StatusReport { service, status })
}

/// Fetch the last `lines` journal entries for the unit. Bounds on `lines`
/// are the front-ends' responsibility.
///
/// # Errors
///
/// Guard failures and launch failures only.
pub async fn recent_logs(
    registry: &Registry,
    runner: &impl CommandRunner,
    application: &str,
    lines: u32,
) -> Result<LogsReport> {
    let descriptor = registry.require_application(application)?;
    let service = descriptor.service_name.clone();
    registry.require_service(&service)?;
    tracing::debug!(service = %service, lines, "fetching recent logs");

    let lines = lines.to_string();
    let logs = runner
        .run(
            &["journalctl", "-u", &service, "-n", &lines, "--no-pager"],
            None,
        )
        .await?;
    Ok(LogsReport { service, logs })
}
