//! Source checkout: clone on first use, update thereafter.

use crate::config::Registry;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::report::CheckoutReport;

/// Clone the application's repository at its configured branch, or bring
/// an existing checkout up to date (fetch, checkout branch, pull). On the
/// update path the first non-zero exit short-circuits the rest.
///
/// Network and auth failures surface as ordinary non-zero exits in the
/// report, not as errors.
///
/// # Errors
///
/// Returns an error for an unknown application or when git cannot be
/// launched at all.
pub async fn checkout(
    registry: &Registry,
    runner: &impl CommandRunner,
    application: &str,
) -> Result<CheckoutReport> {
    let descriptor = registry.require_application(application)?;
    tracing::info!(app = %application, "checking out application source");

    let repo_dir = registry.checkout_dir(application);
    if let Some(parent) = repo_dir.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::fs("cannot create checkout parent", parent, e))?;
    }

    let details = if repo_dir.exists() {
        let fetch = runner.run(&["git", "fetch"], Some(&repo_dir)).await?;
        if !fetch.success() {
            fetch
        } else {
            let switch = runner
                .run(&["git", "checkout", &descriptor.branch], Some(&repo_dir))
                .await?;
            if !switch.success() {
                switch
            } else {
                runner.run(&["git", "pull"], Some(&repo_dir)).await?
            }
        }
    } else {
        let target = repo_dir.to_string_lossy();
        runner
            .run(
                &[
                    "git",
                    "clone",
                    "-b",
                    &descriptor.branch,
                    &descriptor.git_url,
                    target.as_ref(),
                ],
                None,
            )
            .await?
    };

    if !details.success() {
        tracing::warn!(app = %application, exit_code = details.exit_code, "checkout failed");
    }
    Ok(CheckoutReport::from_output(details))
}
