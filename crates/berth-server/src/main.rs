//! berth server entry point.
//!
//! Initialises tracing, loads configuration from environment variables
//! (prefixed with `BERTH_`), loads the application registry, and serves
//! two front-ends over one engine: a Streamable-HTTP MCP endpoint at
//! `/mcp` and the REST API under `/api/v1`.

mod http;
mod system;
#[cfg(test)]
mod test_support;
mod tools;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};

use berth_core::{Deployer, Registry};

use crate::tools::BerthTools;

// ===================================================================
// Configuration
// ===================================================================

/// Server configuration loaded from environment variables via `envy`.
///
/// Each field maps to `BERTH_<FIELD>`:
///   - `BERTH_LISTEN_ADDR`          (default `127.0.0.1:8002`)
///   - `BERTH_REGISTRY_PATH`        (default `/etc/berth/registry.yaml`)
///   - `BERTH_COMMAND_TIMEOUT_SECS` (default `600`)
#[derive(Debug, Deserialize)]
struct Config {
    /// Socket address to bind the HTTP server to.
    #[serde(default = "default_listen_addr")]
    listen_addr: String,

    /// Path to the registry YAML naming deployable applications.
    #[serde(default = "default_registry_path")]
    registry_path: String,

    /// Timeout for every spawned command, in seconds.
    #[serde(default = "default_command_timeout_secs")]
    command_timeout_secs: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8002".to_string()
}

fn default_registry_path() -> String {
    "/etc/berth/registry.yaml".to_string()
}

fn default_command_timeout_secs() -> u64 {
    600
}

// ===================================================================
// Entry point
// ===================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialise tracing with RUST_LOG env filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("berth-server starting");

    // 2. Load configuration from BERTH_* env vars.
    let config: Config = envy::prefixed("BERTH_")
        .from_env()
        .context("failed to load config from BERTH_* env vars")?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        registry_path = %config.registry_path,
        command_timeout_secs = config.command_timeout_secs,
        "configuration loaded",
    );

    // 3. Load the application registry and build the engine.
    let registry = Registry::load(Path::new(&config.registry_path))
        .with_context(|| format!("failed to load registry from {}", config.registry_path))?;

    tracing::info!(
        applications = registry.application_ids().len(),
        "registry loaded",
    );

    let deployer = Deployer::new(registry, Duration::from_secs(config.command_timeout_secs));
    let state = Arc::new(deployer);

    // 4. Build the Streamable-HTTP MCP service. The factory closure
    //    creates a fresh BerthTools per session, each sharing the same
    //    engine.
    let state_for_factory = state.clone();
    let service = StreamableHttpService::new(
        move || Ok(BerthTools::new(state_for_factory.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    // 5. Compose the axum router:
    //    - `/mcp`          → MCP Streamable-HTTP transport
    //    - everything else → REST API (http.rs), including `/health`
    let router = axum::Router::new()
        .nest_service("/mcp", service)
        .merge(http::router(state));

    // 6. Bind and serve.
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .context("failed to bind TCP listener")?;

    tracing::info!("server ready — http://{}/mcp", config.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("berth-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) for graceful shutdown.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl-C handler");
    tracing::info!("received shutdown signal");
}
