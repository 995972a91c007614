//! Artifact verification: does the build output exist, and is it real?

use crate::artifact::resolve_artifact;
use crate::config::Registry;
use crate::error::{Error, Result};
use crate::report::VerifyReport;

/// Resolve the application's artifact and check that it exists with a
/// non-zero size. A missing or empty artifact is a graceful failure the
/// caller can act on, not an error.
///
/// # Errors
///
/// Returns an error for an unknown application or an unreadable
/// filesystem.
pub async fn verify(registry: &Registry, application: &str) -> Result<VerifyReport> {
    let descriptor = registry.require_application(application)?;
    tracing::info!(app = %application, "verifying artifact");

    let artifact = match resolve_artifact(&registry.checkout_dir(application), descriptor) {
        Ok(path) => path,
        Err(Error::NoArtifact { pattern }) => {
            return Ok(VerifyReport::failed(format!(
                "artifact not found: no match for '{pattern}'"
            )));
        }
        Err(e) => return Err(e),
    };

    let metadata = match tokio::fs::metadata(&artifact).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(VerifyReport::failed("artifact not found"));
        }
        Err(e) => return Err(Error::fs("cannot stat artifact", artifact, e)),
    };

    if metadata.len() == 0 {
        return Ok(VerifyReport::failed("artifact is empty"));
    }
    Ok(VerifyReport::ok(artifact, metadata.len()))
}
