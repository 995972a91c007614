//! Deploy: swap the resolved artifact into the deploy directory.
//!
//! Ordering is the load-bearing part. The artifact is first copied to a
//! staging name in the deploy directory, and only after that copy fully
//! succeeds is the current target moved to `<name>.bak` and the staged
//! copy renamed into place. A failed copy therefore never leaves the
//! target path empty, and both moves are same-directory renames.

use std::path::Path;

use crate::artifact::resolve_artifact;
use crate::config::Registry;
use crate::error::{Error, Result};
use crate::report::DeployReport;

/// Deploy the application's current artifact, keeping the previously
/// deployed file as the single `.bak` rollback copy and repointing the
/// stable link when one is configured.
///
/// # Errors
///
/// Returns [`Error::InvalidApplication`] for unknown applications,
/// [`Error::ArtifactMissing`] when there is nothing to deploy, and
/// [`Error::Fs`] for filesystem failures; partial failures are never
/// silently swallowed.
pub async fn deploy(registry: &Registry, application: &str) -> Result<DeployReport> {
    let descriptor = registry.require_application(application)?;
    tracing::info!(app = %application, "deploying artifact");

    let artifact = resolve_artifact(&registry.checkout_dir(application), descriptor)
        .map_err(|e| match e {
            Error::NoArtifact { .. } => Error::ArtifactMissing,
            other => other,
        })?;
    match tokio::fs::metadata(&artifact).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::error!(app = %application, artifact = %artifact.display(), "nothing to deploy");
            return Err(Error::ArtifactMissing);
        }
        Err(e) => return Err(Error::fs("cannot stat artifact", artifact, e)),
    }

    let deploy_dir = &descriptor.deploy_dir;
    tokio::fs::create_dir_all(deploy_dir)
        .await
        .map_err(|e| Error::fs("cannot create deploy directory", deploy_dir, e))?;

    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or(Error::ArtifactMissing)?;
    let target = deploy_dir.join(&name);
    let backup = deploy_dir.join(format!("{name}.bak"));
    let staging = deploy_dir.join(format!(".{name}.tmp.{}", std::process::id()));

    if let Err(e) = copy_preserving_mtime(&artifact, &staging).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e);
    }

    let had_previous = tokio::fs::try_exists(&target)
        .await
        .map_err(|e| Error::fs("cannot inspect deploy target", &target, e))?;
    if had_previous {
        tracing::info!(app = %application, backup = %backup.display(), "backing up current deployment");
        tokio::fs::rename(&target, &backup)
            .await
            .map_err(|e| Error::fs("cannot back up current deployment", &backup, e))?;
    }
    tokio::fs::rename(&staging, &target)
        .await
        .map_err(|e| Error::fs("cannot move staged artifact into place", &target, e))?;

    if let Some(link_name) = &descriptor.stable_link_name {
        repoint_stable_link(&deploy_dir.join(link_name), &target).await?;
    }

    let backup_present = tokio::fs::try_exists(&backup)
        .await
        .map_err(|e| Error::fs("cannot inspect backup", &backup, e))?;
    tracing::info!(app = %application, target = %target.display(), "artifact deployed");
    Ok(DeployReport::new(target, backup_present.then_some(backup)))
}

/// Copy `source` to `dest`, carrying over the modification time so the
/// deployed file still ranks correctly by recency.
async fn copy_preserving_mtime(source: &Path, dest: &Path) -> Result<()> {
    tokio::fs::copy(source, dest)
        .await
        .map_err(|e| Error::fs("cannot copy artifact", dest, e))?;
    let metadata = tokio::fs::metadata(source)
        .await
        .map_err(|e| Error::fs("cannot stat artifact", source, e))?;
    let mtime = filetime::FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(dest, mtime)
        .map_err(|e| Error::fs("cannot preserve artifact mtime", dest, e))?;
    Ok(())
}

/// Replace whatever occupies the link path (symlink, file, or nothing)
/// with a symlink to `target`.
async fn repoint_stable_link(link: &Path, target: &Path) -> Result<()> {
    match tokio::fs::symlink_metadata(link).await {
        Ok(_) => {
            tokio::fs::remove_file(link)
                .await
                .map_err(|e| Error::fs("cannot remove old stable link", link, e))?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::fs("cannot inspect stable link", link, e)),
    }
    tokio::fs::symlink(target, link)
        .await
        .map_err(|e| Error::fs("cannot create stable link", link, e))?;
    tracing::info!(link = %link.display(), target = %target.display(), "stable link updated");
    Ok(())
}
