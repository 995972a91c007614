//! Typed step reports.
//!
//! Every step operation returns one of these instead of a raw exit code so
//! the front-ends can serialize results verbatim and the workflow engine
//! can branch on `success` without exception-style control flow. Field
//! names are the wire contract; renaming one is a breaking API change.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::exec::CommandOutput;

/// Result of `checkout`: clone or update of the source tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutReport {
    pub success: bool,
    pub details: CommandOutput,
}

impl CheckoutReport {
    pub(crate) fn from_output(details: CommandOutput) -> Self {
        Self {
            success: details.success(),
            details,
        }
    }
}

/// Result of `build`: one run of the build kind's fixed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub success: bool,
    pub logs: CommandOutput,
}

impl BuildReport {
    pub(crate) fn from_output(logs: CommandOutput) -> Self {
        Self {
            success: logs.success(),
            logs,
        }
    }
}

/// Result of `verify`: artifact existence and size check.
///
/// `artifact`/`size_bytes` are present on success, `error` on failure;
/// absent fields are omitted from the serialized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub artifact: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl VerifyReport {
    pub(crate) fn ok(artifact: PathBuf, size_bytes: u64) -> Self {
        Self {
            success: true,
            artifact: Some(artifact),
            size_bytes: Some(size_bytes),
            error: None,
        }
    }

    pub(crate) fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            artifact: None,
            size_bytes: None,
            error: Some(reason.into()),
        }
    }
}

/// Result of `deploy`. `backup` is `null` when no previous target existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployReport {
    pub success: bool,
    pub deployed_to: PathBuf,
    pub backup: Option<PathBuf>,
}

impl DeployReport {
    pub(crate) fn new(deployed_to: PathBuf, backup: Option<PathBuf>) -> Self {
        Self {
            success: true,
            deployed_to,
            backup,
        }
    }
}

/// Result of `restart` or `stop` on the application's service unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceReport {
    pub service: String,
    pub success: bool,
    pub details: CommandOutput,
}

impl ServiceReport {
    pub(crate) fn from_output(service: String, details: CommandOutput) -> Self {
        Self {
            service,
            success: details.success(),
            details,
        }
    }
}

/// Result of `status`: raw supervisor output, no success distinction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub service: String,
    pub status: CommandOutput,
}

/// Result of `logs`: raw journal output for the unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsReport {
    pub service: String,
    pub logs: CommandOutput,
}

/// What one attempted workflow step produced.
///
/// Serializes transparently as the underlying report, or as `{"error": …}`
/// when the step raised instead of reporting.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StepOutcome {
    Checkout(CheckoutReport),
    Build(BuildReport),
    Verify(VerifyReport),
    Deploy(DeployReport),
    Service(ServiceReport),
    Status(StatusReport),
    Error { error: String },
}

impl StepOutcome {
    /// Whether the workflow may continue past this outcome.
    #[must_use]
    pub fn success(&self) -> bool {
        match self {
            Self::Checkout(r) => r.success,
            Self::Build(r) => r.success,
            Self::Verify(r) => r.success,
            Self::Deploy(r) => r.success,
            Self::Service(r) => r.success,
            // Status is observational; it never fails the run.
            Self::Status(_) => true,
            Self::Error { .. } => false,
        }
    }
}

impl From<CheckoutReport> for StepOutcome {
    fn from(r: CheckoutReport) -> Self {
        Self::Checkout(r)
    }
}

impl From<BuildReport> for StepOutcome {
    fn from(r: BuildReport) -> Self {
        Self::Build(r)
    }
}

impl From<VerifyReport> for StepOutcome {
    fn from(r: VerifyReport) -> Self {
        Self::Verify(r)
    }
}

impl From<DeployReport> for StepOutcome {
    fn from(r: DeployReport) -> Self {
        Self::Deploy(r)
    }
}

impl From<ServiceReport> for StepOutcome {
    fn from(r: ServiceReport) -> Self {
        Self::Service(r)
    }
}

impl From<StatusReport> for StepOutcome {
    fn from(r: StatusReport) -> Self {
        Self::Status(r)
    }
}
