//! Host-level inspection: running services and a health summary.
//!
//! These queries read the whole host rather than one registered
//! application, so they sit beside the engine instead of inside it.
//! Output is the raw (tail-truncated) stdout of standard tools; parsing
//! it is the caller's business.

use serde::Serialize;

use berth_core::{CommandRunner, Result};

/// Output of the running-services listing.
#[derive(Debug, Serialize)]
pub struct RunningServicesReport {
    /// `systemctl list-units` output.
    pub running_services: String,
}

/// Snapshot of host load, memory, disk, and CPU.
#[derive(Debug, Serialize)]
pub struct HostHealthReport {
    /// `uptime` output (includes the load averages).
    pub load_average: String,
    /// `free -h` output.
    pub memory: String,
    /// `df -h` output.
    pub disk: String,
    /// `vmstat 1 2` output; the second sample reflects current activity.
    pub cpu: String,
}

/// List systemd service units on the host.
///
/// # Errors
///
/// Returns an error only if `systemctl` fails to launch.
pub async fn running_services(runner: &impl CommandRunner) -> Result<RunningServicesReport> {
    tracing::info!("listing running services");
    let listing = runner
        .run(
            &["systemctl", "list-units", "--type=service", "--no-pager"],
            None,
        )
        .await?;
    Ok(RunningServicesReport {
        running_services: listing.stdout,
    })
}

/// Collect a coarse host health snapshot from standard tools.
///
/// # Errors
///
/// Returns an error if any of the probes fails to launch.
pub async fn host_health(runner: &impl CommandRunner) -> Result<HostHealthReport> {
    tracing::info!("collecting host health summary");
    let load = runner.run(&["uptime"], None).await?;
    let memory = runner.run(&["free", "-h"], None).await?;
    let disk = runner.run(&["df", "-h"], None).await?;
    let cpu = runner.run(&["vmstat", "1", "2"], None).await?;
    Ok(HostHealthReport {
        load_average: load.stdout,
        memory: memory.stdout,
        disk: disk.stdout,
        cpu: cpu.stdout,
    })
}
