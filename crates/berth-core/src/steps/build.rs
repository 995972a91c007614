//! Build: run the application's build system in its checkout.

use crate::config::Registry;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::report::BuildReport;

/// Run the build kind's fixed command in the checkout root. A non-zero
/// exit (including a timeout's synthetic `-1`) is reported, not raised.
///
/// # Errors
///
/// Returns an error for an unknown application or when the build command
/// cannot be launched.
pub async fn build(
    registry: &Registry,
    runner: &impl CommandRunner,
    application: &str,
) -> Result<BuildReport> {
    let descriptor = registry.require_application(application)?;
    tracing::info!(app = %application, build = ?descriptor.build, "building application");

    let repo_dir = registry.checkout_dir(application);
    let logs = runner
        .run(descriptor.build.command(), Some(&repo_dir))
        .await?;

    if logs.success() {
        tracing::info!(app = %application, "build succeeded");
    } else {
        tracing::warn!(app = %application, exit_code = logs.exit_code, "build failed");
    }
    Ok(BuildReport::from_output(logs))
}
