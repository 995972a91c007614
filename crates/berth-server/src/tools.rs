//! MCP tool implementations for the deployment server.
//!
//! One tool per step operation plus the full workflow and two host-level
//! queries:
//!   - `get_deployment_configuration`
//!   - `checkout_repository`, `build_application`, `verify_artifact`,
//!     `deploy_artifact`
//!   - `restart_application`, `stop_application`
//!   - `get_application_status`, `get_recent_logs`
//!   - `full_deploy`
//!   - `get_running_services`, `get_server_health`
//!
//! Every tool is a thin delegation into [`berth_core::Deployer`]; the
//! allow-list guards live there, not here. Results are returned as the
//! operation's report object serialized to JSON.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::ServerInfo,
    tool, tool_handler, tool_router, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;

use berth_core::Deployer;

use crate::system;

/// Journal lines served when the caller does not specify a count.
pub(crate) const DEFAULT_LOG_LINES: u32 = 100;

/// Inclusive bounds accepted for a journal line count.
pub(crate) const LOG_LINES_MIN: u32 = 1;
pub(crate) const LOG_LINES_MAX: u32 = 10_000;

// ===================================================================
// Input structs
// ===================================================================

/// Input parameters for tools acting on one registered application.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ApplicationInput {
    /// Registered application identifier.
    pub application: String,
}

/// Input parameters for the `get_recent_logs` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RecentLogsInput {
    /// Registered application identifier.
    pub application: String,
    /// Number of journal lines to fetch (1-10000, default 100).
    pub lines: Option<u32>,
}

// ===================================================================
// BerthTools — the MCP server handler
// ===================================================================

/// MCP server handler exposing the deployment tool surface.
///
/// Holds a shared reference to the engine; one instance is created per
/// MCP session, all sharing the same registry and lock table.
#[derive(Clone)]
pub struct BerthTools {
    state: Arc<Deployer>,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for BerthTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BerthTools")
            .field("state", &"<Deployer>")
            .finish()
    }
}

impl BerthTools {
    /// Create a new `BerthTools` sharing the given engine.
    pub fn new(state: Arc<Deployer>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }
}

// -------------------------------------------------------------------
// Tool implementations
// -------------------------------------------------------------------

#[tool_router]
impl BerthTools {
    /// Return the registry of deployable applications.
    #[tool(description = "Get the deployment configuration: every \
        registered application with its repository, branch, build kind, \
        artifact pattern, service name, and deploy directory.")]
    async fn get_deployment_configuration(&self) -> Result<String, String> {
        let view = self.state.configuration();
        serde_json::to_string(&view).map_err(|e| format!("Serialization error: {e}"))
    }

    /// Clone or update the application's repository.
    #[tool(description = "Clone the application's repository at its \
        pinned branch, or fetch and pull if a checkout already exists.")]
    async fn checkout_repository(
        &self,
        params: Parameters<ApplicationInput>,
    ) -> Result<String, String> {
        let input = params.0;
        let report = self
            .state
            .checkout(&input.application)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&report).map_err(|e| format!("Serialization error: {e}"))
    }

    /// Build the application from its checkout.
    #[tool(description = "Build the application inside its checkout \
        using the registered build command. Returns the build logs; \
        check `success` before deploying.")]
    async fn build_application(
        &self,
        params: Parameters<ApplicationInput>,
    ) -> Result<String, String> {
        let input = params.0;
        let report = self
            .state
            .build(&input.application)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&report).map_err(|e| format!("Serialization error: {e}"))
    }

    /// Check the build artifact exists and is non-empty.
    #[tool(description = "Verify the build artifact exists and is \
        non-empty. Run after build_application and before \
        deploy_artifact.")]
    async fn verify_artifact(
        &self,
        params: Parameters<ApplicationInput>,
    ) -> Result<String, String> {
        let input = params.0;
        let report = self
            .state
            .verify(&input.application)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&report).map_err(|e| format!("Serialization error: {e}"))
    }

    /// Copy the artifact into the deploy directory, keeping a backup.
    #[tool(description = "Deploy the built artifact into the \
        application's deploy directory. The previous deployed file is \
        kept as a .bak backup.")]
    async fn deploy_artifact(
        &self,
        params: Parameters<ApplicationInput>,
    ) -> Result<String, String> {
        let input = params.0;
        let report = self
            .state
            .deploy(&input.application)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&report).map_err(|e| format!("Serialization error: {e}"))
    }

    /// Restart the application's systemd service.
    #[tool(description = "Restart the application's systemd service via \
        systemctl.")]
    async fn restart_application(
        &self,
        params: Parameters<ApplicationInput>,
    ) -> Result<String, String> {
        let input = params.0;
        let report = self
            .state
            .restart(&input.application)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&report).map_err(|e| format!("Serialization error: {e}"))
    }

    /// Stop the application's systemd service.
    #[tool(description = "Stop the application's systemd service via \
        systemctl.")]
    async fn stop_application(
        &self,
        params: Parameters<ApplicationInput>,
    ) -> Result<String, String> {
        let input = params.0;
        let report = self
            .state
            .stop(&input.application)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&report).map_err(|e| format!("Serialization error: {e}"))
    }

    /// Query the application's systemd service status.
    #[tool(description = "Get the systemd status output for the \
        application's service.")]
    async fn get_application_status(
        &self,
        params: Parameters<ApplicationInput>,
    ) -> Result<String, String> {
        let input = params.0;
        let report = self
            .state
            .status(&input.application)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&report).map_err(|e| format!("Serialization error: {e}"))
    }

    /// Fetch recent journal lines for the application's service.
    #[tool(description = "Fetch recent journal lines for the \
        application's service (1-10000 lines, default 100).")]
    async fn get_recent_logs(
        &self,
        params: Parameters<RecentLogsInput>,
    ) -> Result<String, String> {
        let input = params.0;
        let lines = validated_lines(input.lines)?;
        let report = self
            .state
            .recent_logs(&input.application, lines)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&report).map_err(|e| format!("Serialization error: {e}"))
    }

    /// Run the whole deployment workflow, stopping at the first failure.
    #[tool(description = "Run the full deployment workflow: checkout, \
        build, verify, deploy, restart, status. Stops at the first \
        failed step; one run per application at a time.")]
    async fn full_deploy(&self, params: Parameters<ApplicationInput>) -> Result<String, String> {
        let input = params.0;
        let run = self
            .state
            .full_deploy(&input.application)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&run).map_err(|e| format!("Serialization error: {e}"))
    }

    /// List systemd service units on the host.
    #[tool(description = "List all systemd service units on the server.")]
    async fn get_running_services(&self) -> Result<String, String> {
        let report = system::running_services(self.state.runner())
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&report).map_err(|e| format!("Serialization error: {e}"))
    }

    /// Summarize host load, memory, disk, and CPU.
    #[tool(description = "Get a server health summary: load average, \
        memory, disk, and CPU.")]
    async fn get_server_health(&self) -> Result<String, String> {
        let report = system::host_health(self.state.runner())
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&report).map_err(|e| format!("Serialization error: {e}"))
    }
}

// -------------------------------------------------------------------
// ServerHandler implementation (via tool_handler macro)
// -------------------------------------------------------------------

#[tool_handler]
impl ServerHandler for BerthTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Controlled Linux deployment tools. Only registered \
                 applications and their services can be touched. Deploy in \
                 order: checkout_repository, build_application, \
                 verify_artifact, deploy_artifact, restart_application, \
                 get_application_status — or run full_deploy, which stops \
                 at the first failed step. Never assume a step succeeded; \
                 read each result. One deployment per application at a \
                 time."
                    .into(),
            ),
            ..Default::default()
        }
    }
}

// -------------------------------------------------------------------
// Helpers
// -------------------------------------------------------------------

/// Apply the default and bounds for a journal line count.
///
/// Both front-ends call this before the engine sees the request.
pub(crate) fn validated_lines(lines: Option<u32>) -> Result<u32, String> {
    let lines = lines.unwrap_or(DEFAULT_LOG_LINES);
    if (LOG_LINES_MIN..=LOG_LINES_MAX).contains(&lines) {
        Ok(lines)
    } else {
        Err(format!(
            "lines must be between {LOG_LINES_MIN} and {LOG_LINES_MAX}, got {lines}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_lines_defaults_to_100() {
        assert_eq!(validated_lines(None), Ok(100));
    }

    #[test]
    fn validated_lines_accepts_the_bounds() {
        assert_eq!(validated_lines(Some(1)), Ok(1));
        assert_eq!(validated_lines(Some(10_000)), Ok(10_000));
    }

    #[test]
    fn validated_lines_rejects_out_of_range() {
        assert!(validated_lines(Some(0)).is_err());
        assert!(validated_lines(Some(10_001)).is_err());
    }
}
