//! Typed errors for the deployment engine.
//!
//! Expected business failures (validation, missing artifact, lock
//! contention) carry their own variants so the front-ends can map them to
//! protocol-appropriate responses; everything else is an I/O or spawn
//! failure bubbled up with context.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the deployment engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The application id is not in the deployment registry.
    #[error("application '{0}' not allowed")]
    InvalidApplication(String),

    /// The service unit is not in the service allow-list.
    #[error("service '{0}' not allowed")]
    InvalidService(String),

    /// A wildcard artifact pattern matched nothing.
    #[error("no artifact found matching pattern '{pattern}'")]
    NoArtifact { pattern: String },

    /// Deploy was asked to ship an artifact that does not exist yet.
    #[error("artifact not found, build first")]
    ArtifactMissing,

    /// Another workflow already holds the deployment lease for this app.
    #[error("deployment already in progress for '{0}'")]
    DeploymentInProgress(String),

    /// The executor could not launch the child process at all.
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem failure during deploy or resolution.
    #[error("{context} ({path}): {source}")]
    Fs {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The registry file could not be read, parsed, or validated.
    #[error("registry error: {0}")]
    Registry(String),
}

impl Error {
    /// True for caller mistakes that front-ends surface as client errors
    /// (HTTP 400); everything else is a server-side failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidApplication(_)
                | Error::InvalidService(_)
                | Error::NoArtifact { .. }
                | Error::ArtifactMissing
        )
    }

    pub(crate) fn fs(
        context: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Error::Fs {
            context,
            path: path.into(),
            source,
        }
    }
}
