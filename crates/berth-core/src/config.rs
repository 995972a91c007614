//! Application registry and access guard.
//!
//! The registry is the single source of truth for what may be deployed:
//! a mapping from application id to its deployment descriptor, plus the
//! service allow-list. It is loaded once at startup and passed explicitly
//! to every component that needs it; nothing in the engine consults
//! ambient global state.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Build systems the engine knows how to drive.
///
/// Unknown kinds fail serde deserialization, so a descriptor that reaches
/// a step operation always carries a runnable command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    Maven,
}

impl BuildKind {
    /// Fixed command template for this build system.
    #[must_use]
    pub fn command(self) -> &'static [&'static str] {
        match self {
            Self::Maven => &["mvn", "clean", "package", "-DskipTests"],
        }
    }
}

/// Deployment configuration for one application. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub git_url: String,
    pub branch: String,
    pub build: BuildKind,
    /// Path relative to the checkout root; only the final segment may
    /// contain `*` wildcards.
    pub artifact_pattern: String,
    /// Systemd unit managed for this application.
    pub service_name: String,
    /// Absolute directory the running artifact lives in.
    pub deploy_dir: PathBuf,
    /// Fixed filename kept pointing at the currently deployed artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_link_name: Option<String>,
}

/// On-disk registry shape.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    base_repo_dir: PathBuf,
    #[serde(default)]
    allowed_services: Option<BTreeSet<String>>,
    applications: BTreeMap<String, AppDescriptor>,
}

/// Wire view returned by the configuration endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationView {
    pub applications: BTreeMap<String, AppDescriptor>,
}

/// Immutable registry of deployable applications and allowed services.
#[derive(Debug, Clone)]
pub struct Registry {
    base_repo_dir: PathBuf,
    applications: BTreeMap<String, AppDescriptor>,
    allowed_services: BTreeSet<String>,
}

impl Registry {
    /// Load and validate the registry from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Registry`] if the file cannot be read or parsed,
    /// or if any descriptor fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Registry(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a registry from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Registry`] on parse or validation failure.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: RegistryFile = serde_yaml::from_str(content)
            .map_err(|e| Error::Registry(format!("cannot parse registry: {e}")))?;
        Self::validate(file)
    }

    fn validate(file: RegistryFile) -> Result<Self> {
        for (id, descriptor) in &file.applications {
            if id.is_empty() {
                return Err(Error::Registry("application id must not be empty".into()));
            }
            if !descriptor.deploy_dir.is_absolute() {
                return Err(Error::Registry(format!(
                    "deploy_dir for '{id}' must be absolute"
                )));
            }
            if descriptor.artifact_pattern.is_empty()
                || Path::new(&descriptor.artifact_pattern).is_absolute()
            {
                return Err(Error::Registry(format!(
                    "artifact_pattern for '{id}' must be relative to the checkout root"
                )));
            }
            if let Some(parent) = Path::new(&descriptor.artifact_pattern).parent() {
                if parent.to_string_lossy().contains('*') {
                    return Err(Error::Registry(format!(
                        "artifact_pattern for '{id}': wildcards are only supported in the file name"
                    )));
                }
            }
            if descriptor.service_name.is_empty() {
                return Err(Error::Registry(format!(
                    "service_name for '{id}' must not be empty"
                )));
            }
        }

        // Absent allow-list defaults to the registered service names.
        let allowed_services = file.allowed_services.unwrap_or_else(|| {
            file.applications
                .values()
                .map(|d| d.service_name.clone())
                .collect()
        });

        Ok(Self {
            base_repo_dir: file.base_repo_dir,
            applications: file.applications,
            allowed_services,
        })
    }

    /// Access guard: resolve an application id or reject it.
    ///
    /// This is the sole gate between caller-supplied identifiers and the
    /// step operations; denials are logged for audit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidApplication`] for ids outside the registry.
    pub fn require_application(&self, id: &str) -> Result<&AppDescriptor> {
        match self.applications.get(id) {
            Some(descriptor) => {
                tracing::debug!(app = %id, "application allowed");
                Ok(descriptor)
            }
            None => {
                tracing::warn!(app = %id, "rejected application outside the registry");
                Err(Error::InvalidApplication(id.to_string()))
            }
        }
    }

    /// Access guard: check a service unit against the allow-list.
    ///
    /// Independent of application validity; a registered application whose
    /// service was removed from the allow-list is still rejected here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidService`] for units outside the allow-list.
    pub fn require_service(&self, service: &str) -> Result<()> {
        if self.allowed_services.contains(service) {
            tracing::debug!(service = %service, "service allowed");
            Ok(())
        } else {
            tracing::warn!(service = %service, "rejected service outside the allow-list");
            Err(Error::InvalidService(service.to_string()))
        }
    }

    /// Directory the application's source is checked out into.
    #[must_use]
    pub fn checkout_dir(&self, id: &str) -> PathBuf {
        self.base_repo_dir.join(id)
    }

    #[must_use]
    pub fn base_repo_dir(&self) -> &Path {
        &self.base_repo_dir
    }

    #[must_use]
    pub fn application_ids(&self) -> Vec<&str> {
        self.applications.keys().map(String::as_str).collect()
    }

    /// Snapshot served by the configuration endpoints.
    #[must_use]
    pub fn configuration(&self) -> ConfigurationView {
        ConfigurationView {
            applications: self.applications.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
base_repo_dir: /opt/berth/repos
applications:
  famvest:
    git_url: https://github.com/ysonawan/famvest.git
    branch: main
    build: maven
    artifact_pattern: target/famvest-*.jar
    service_name: famvest
    deploy_dir: /opt/app/famvest
    stable_link_name: famvest.jar
  netly:
    git_url: https://github.com/ysonawan/netly.git
    branch: main
    build: maven
    artifact_pattern: target/netly-*.jar
    service_name: netly
    deploy_dir: /opt/app/netly
";

    #[test]
    fn loads_descriptors_and_derives_allow_list() {
        let registry = Registry::from_yaml(SAMPLE).unwrap();
        let famvest = registry.require_application("famvest").unwrap();
        assert_eq!(famvest.branch, "main");
        assert_eq!(famvest.build, BuildKind::Maven);
        assert_eq!(famvest.stable_link_name.as_deref(), Some("famvest.jar"));
        assert_eq!(
            registry.checkout_dir("famvest"),
            PathBuf::from("/opt/berth/repos/famvest")
        );
        registry.require_service("famvest").unwrap();
        registry.require_service("netly").unwrap();
        assert_eq!(registry.application_ids(), vec!["famvest", "netly"]);
    }

    #[test]
    fn unknown_application_is_rejected() {
        let registry = Registry::from_yaml(SAMPLE).unwrap();
        let err = registry.require_application("ghost").unwrap_err();
        assert!(matches!(err, Error::InvalidApplication(name) if name == "ghost"));
    }

    #[test]
    fn explicit_allow_list_overrides_derived_one() {
        let yaml = format!("{SAMPLE}\nallowed_services: [famvest]\n");
        let registry = Registry::from_yaml(&yaml).unwrap();
        registry.require_service("famvest").unwrap();
        // netly is a registered application but its unit was not listed.
        let err = registry.require_service("netly").unwrap_err();
        assert!(matches!(err, Error::InvalidService(name) if name == "netly"));
    }

    #[test]
    fn unknown_build_kind_fails_at_load() {
        let yaml = SAMPLE.replace("build: maven", "build: gradle");
        let err = Registry::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, Error::Registry(_)));
        assert!(err.to_string().contains("gradle"));
    }

    #[test]
    fn relative_deploy_dir_fails_at_load() {
        let yaml = SAMPLE.replace("deploy_dir: /opt/app/netly", "deploy_dir: opt/app/netly");
        let err = Registry::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("must be absolute"));
    }

    #[test]
    fn wildcard_outside_file_name_fails_at_load() {
        let yaml = SAMPLE.replace(
            "artifact_pattern: target/netly-*.jar",
            "artifact_pattern: tar*/netly.jar",
        );
        let err = Registry::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("file name"));
    }

    #[test]
    fn maven_command_is_fixed() {
        assert_eq!(
            BuildKind::Maven.command(),
            &["mvn", "clean", "package", "-DskipTests"]
        );
    }

    #[test]
    fn configuration_snapshot_serializes_applications() {
        let registry = Registry::from_yaml(SAMPLE).unwrap();
        let value = serde_json::to_value(registry.configuration()).unwrap();
        assert!(value["applications"]["famvest"]["git_url"]
            .as_str()
            .unwrap()
            .ends_with("famvest.git"));
        assert_eq!(value["applications"]["netly"]["build"], "maven");
        assert!(value["applications"]["netly"]
            .get("stable_link_name")
            .is_none());
    }
}
