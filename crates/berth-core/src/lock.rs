//! Per-application deployment locks.
//!
//! One workflow at a time per application. Acquisition never blocks or
//! queues: a caller either gets the lease immediately or is told a
//! deployment is already in progress. Individual step operations invoked
//! outside the workflow do not take these locks.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result};

/// In-process lock table keyed by application id.
#[derive(Debug, Default, Clone)]
pub struct DeployLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

/// Proof of exclusive deployment rights for one application. Releases on
/// drop, including on early returns and panics.
#[derive(Debug)]
pub struct DeployLease {
    application: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl DeployLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the deployment lease for `application`, or fail immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeploymentInProgress`] when the lease is already
    /// held.
    pub fn try_acquire(&self, application: &str) -> Result<DeployLease> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(application.to_string()) {
            tracing::warn!(app = %application, "deployment lease already held");
            return Err(Error::DeploymentInProgress(application.to_string()));
        }
        tracing::debug!(app = %application, "deployment lease acquired");
        Ok(DeployLease {
            application: application.to_string(),
            held: Arc::clone(&self.held),
        })
    }
}

impl Drop for DeployLease {
    fn drop(&mut self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.application);
        tracing::debug!(app = %self.application, "deployment lease released");
    }
}
