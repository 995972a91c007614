//! Step operations: the individually invocable deployment actions.
//!
//! Each operation validates its application (and, where it touches the
//! service manager, its service unit) through the access guard before any
//! filesystem or process action, and returns a typed report. None of them
//! retry internally, and none of them take the deployment lock; sequencing
//! and locking belong to the workflow engine.

mod build;
mod checkout;
mod deploy;
mod service;
mod verify;

pub use build::build;
pub use checkout::checkout;
pub use deploy::deploy;
pub use service::{recent_logs, restart, status, stop};
pub use verify::verify;

#[cfg(test)]
pub(crate) mod test_support;
