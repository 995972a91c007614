//! REST front-end for the deployment engine.
//!
//! Thin protocol layer: each route guards its input, calls one engine
//! operation, and wraps the result in the `{success, data}` envelope.
//! Validation failures map to 400, a held deployment lock to 409, and
//! anything else to a generic 500 with the detail logged, not exposed.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use berth_core::{
    BuildReport, CheckoutReport, CommandRunner, ConfigurationView, DeployReport, Deployer, Error,
    LogsReport, ServiceReport, StatusReport, VerifyReport, WorkflowRun,
};

use crate::system::{self, HostHealthReport, RunningServicesReport};
use crate::tools::validated_lines;

/// Success envelope every route responds with.
#[derive(Debug, Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

/// Error reply body; clients read the `detail` field.
#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

type ApiState<R> = State<Arc<Deployer<R>>>;
type ApiResult<T> = Result<Json<Envelope<T>>, (StatusCode, Json<ErrorBody>)>;

/// Creates the API router.
pub fn router<R>(state: Arc<Deployer<R>>) -> Router
where
    R: CommandRunner + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/configuration", get(configuration::<R>))
        .route(
            "/api/v1/repository/checkout/{application}",
            post(checkout::<R>),
        )
        .route("/api/v1/build/application/{application}", post(build::<R>))
        .route("/api/v1/artifact/verify/{application}", post(verify::<R>))
        .route("/api/v1/deployment/deploy/{application}", post(deploy::<R>))
        .route(
            "/api/v1/application/restart/{application}",
            post(restart::<R>),
        )
        .route("/api/v1/application/stop/{application}", post(stop::<R>))
        .route("/api/v1/application/status/{application}", get(status::<R>))
        .route("/api/v1/application/logs/{application}", get(logs::<R>))
        .route(
            "/api/v1/deployment/workflow/full-deploy/{application}",
            post(full_deploy::<R>),
        )
        .route("/api/v1/services", get(services::<R>))
        .route("/api/v1/system/health", get(system_health::<R>))
        .with_state(state)
}

/// Service banner for `GET /`.
async fn root() -> Json<Value> {
    Json(json!({
        "service": "berth-server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

/// Liveness probe.
async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn configuration<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
) -> Json<Envelope<ConfigurationView>> {
    info!("deployment configuration requested");
    Json(Envelope {
        success: true,
        data: state.configuration(),
    })
}

async fn checkout<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
    Path(application): Path<String>,
) -> ApiResult<CheckoutReport> {
    info!(app = %application, "repository checkout requested");
    let report = state
        .checkout(&application)
        .await
        .map_err(|e| error_reply(&e, "error checking out repository"))?;
    let success = report.success;
    Ok(envelope(success, report))
}

async fn build<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
    Path(application): Path<String>,
) -> ApiResult<BuildReport> {
    info!(app = %application, "build requested");
    let report = state
        .build(&application)
        .await
        .map_err(|e| error_reply(&e, "error building application"))?;
    let success = report.success;
    Ok(envelope(success, report))
}

async fn verify<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
    Path(application): Path<String>,
) -> ApiResult<VerifyReport> {
    info!(app = %application, "artifact verification requested");
    let report = state
        .verify(&application)
        .await
        .map_err(|e| error_reply(&e, "error verifying artifact"))?;
    let success = report.success;
    Ok(envelope(success, report))
}

async fn deploy<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
    Path(application): Path<String>,
) -> ApiResult<DeployReport> {
    info!(app = %application, "deployment requested");
    let report = state
        .deploy(&application)
        .await
        .map_err(|e| error_reply(&e, "error deploying artifact"))?;
    let success = report.success;
    Ok(envelope(success, report))
}

async fn restart<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
    Path(application): Path<String>,
) -> ApiResult<ServiceReport> {
    info!(app = %application, "service restart requested");
    let report = state
        .restart(&application)
        .await
        .map_err(|e| error_reply(&e, "error restarting application"))?;
    let success = report.success;
    Ok(envelope(success, report))
}

async fn stop<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
    Path(application): Path<String>,
) -> ApiResult<ServiceReport> {
    info!(app = %application, "service stop requested");
    let report = state
        .stop(&application)
        .await
        .map_err(|e| error_reply(&e, "error stopping application"))?;
    let success = report.success;
    Ok(envelope(success, report))
}

async fn status<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
    Path(application): Path<String>,
) -> ApiResult<StatusReport> {
    info!(app = %application, "service status requested");
    let report = state
        .status(&application)
        .await
        .map_err(|e| error_reply(&e, "error fetching application status"))?;
    Ok(envelope(true, report))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    lines: Option<u32>,
}

async fn logs<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
    Path(application): Path<String>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<LogsReport> {
    let lines = validated_lines(query.lines)
        .map_err(|detail| (StatusCode::BAD_REQUEST, Json(ErrorBody { detail })))?;
    info!(app = %application, lines, "recent logs requested");
    let report = state
        .recent_logs(&application, lines)
        .await
        .map_err(|e| error_reply(&e, "error fetching application logs"))?;
    Ok(envelope(true, report))
}

async fn full_deploy<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
    Path(application): Path<String>,
) -> ApiResult<WorkflowRun> {
    info!(app = %application, "full deployment workflow requested");
    let run = state
        .full_deploy(&application)
        .await
        .map_err(|e| error_reply(&e, "unexpected error in deployment workflow"))?;
    let success = run.succeeded();
    Ok(envelope(success, run))
}

async fn services<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
) -> ApiResult<RunningServicesReport> {
    let report = system::running_services(state.runner())
        .await
        .map_err(|e| error_reply(&e, "error fetching running services"))?;
    Ok(envelope(true, report))
}

async fn system_health<R: CommandRunner + 'static>(
    State(state): ApiState<R>,
) -> ApiResult<HostHealthReport> {
    let report = system::host_health(state.runner())
        .await
        .map_err(|e| error_reply(&e, "error fetching server health summary"))?;
    Ok(envelope(true, report))
}

fn envelope<T: Serialize>(success: bool, data: T) -> Json<Envelope<T>> {
    Json(Envelope { success, data })
}

/// Map an engine error to a reply, hiding internal detail on 500s.
fn error_reply(error: &Error, context: &'static str) -> (StatusCode, Json<ErrorBody>) {
    let status = error_to_status(error);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(%error, context, "request failed");
        (
            status,
            Json(ErrorBody {
                detail: context.to_string(),
            }),
        )
    } else {
        tracing::warn!(%error, context, "request rejected");
        (
            status,
            Json(ErrorBody {
                detail: error.to_string(),
            }),
        )
    }
}

fn error_to_status(error: &Error) -> StatusCode {
    if error.is_validation() {
        StatusCode::BAD_REQUEST
    } else if matches!(error, Error::DeploymentInProgress(_)) {
        StatusCode::CONFLICT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use berth_core::Registry;

    use crate::test_support::{output, ScriptRunner};

    use super::*;

    fn registry(dir: &std::path::Path) -> Registry {
        let yaml = format!(
            "base_repo_dir: {repos}\n\
             applications:\n\
             \x20 alpha:\n\
             \x20   git_url: https://git.example.com/alpha.git\n\
             \x20   branch: main\n\
             \x20   build: maven\n\
             \x20   artifact_pattern: target/alpha-*.jar\n\
             \x20   service_name: alpha\n\
             \x20   deploy_dir: {deploy}\n",
            repos = dir.join("repos").display(),
            deploy = dir.join("deploy").display(),
        );
        Registry::from_yaml(&yaml).unwrap()
    }

    fn app(runner: ScriptRunner, dir: &std::path::Path) -> Router {
        router(Arc::new(Deployer::with_runner(registry(dir), runner)))
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(app(ScriptRunner::ok(), dir.path()), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn root_reports_service_banner() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(app(ScriptRunner::ok(), dir.path()), "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "berth-server");
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn configuration_lists_registered_applications() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(ScriptRunner::ok(), dir.path()),
            "GET",
            "/api/v1/configuration",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["applications"]["alpha"]["service_name"], "alpha");
    }

    #[tokio::test]
    async fn checkout_wraps_report_in_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptRunner::scripted([output(0, "Cloning into 'alpha'...\n", "")]);
        let (status, body) = send(
            app(runner, dir.path()),
            "POST",
            "/api/v1/repository/checkout/alpha",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["details"]["exit_code"], 0);
    }

    #[tokio::test]
    async fn unknown_application_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptRunner::ok();
        let log = runner.call_log();
        let (status, body) = send(
            app(runner, dir.path()),
            "POST",
            "/api/v1/repository/checkout/ghost",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("not allowed"));
        assert!(log.lock().unwrap().is_empty(), "no command may run");
    }

    #[tokio::test]
    async fn build_failure_keeps_http_200() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptRunner::scripted([output(1, "", "BUILD FAILURE\n")]);
        let (status, body) = send(
            app(runner, dir.path()),
            "POST",
            "/api/v1/build/application/alpha",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["logs"]["exit_code"], 1);
    }

    #[tokio::test]
    async fn logs_default_to_100_lines() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptRunner::ok();
        let log = runner.call_log();
        let (status, body) = send(
            app(runner, dir.path()),
            "GET",
            "/api/v1/application/logs/alpha",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let calls = log.lock().unwrap();
        assert_eq!(calls[0], ["journalctl", "-u", "alpha", "-n", "100", "--no-pager"]);
    }

    #[tokio::test]
    async fn logs_lines_out_of_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptRunner::ok();
        let log = runner.call_log();
        let (status, body) = send(
            app(runner, dir.path()),
            "GET",
            "/api/v1/application/logs/alpha?lines=0",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("between 1 and 10000"));
        assert!(log.lock().unwrap().is_empty(), "no command may run");
    }

    #[tokio::test]
    async fn workflow_step_failure_is_still_200() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptRunner::scripted([
            output(0, "Cloning into 'alpha'...\n", ""),
            output(1, "", "BUILD FAILURE\n"),
        ]);
        let (status, body) = send(
            app(runner, dir.path()),
            "POST",
            "/api/v1/deployment/workflow/full-deploy/alpha",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["status"], "failed");
        assert_eq!(body["data"]["failed_step"], "build");
        assert_eq!(body["data"]["steps"]["build"]["success"], false);
    }

    #[tokio::test]
    async fn services_route_wraps_listing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptRunner::scripted([output(0, "alpha.service running\n", "")]);
        let (status, body) = send(app(runner, dir.path()), "GET", "/api/v1/services").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["data"]["running_services"]
            .as_str()
            .unwrap()
            .contains("alpha.service"));
    }

    #[test]
    fn validation_conflict_and_internal_status_mapping() {
        assert_eq!(
            error_to_status(&Error::InvalidApplication("ghost".to_string())),
            StatusCode::BAD_REQUEST,
        );
        assert_eq!(
            error_to_status(&Error::DeploymentInProgress("alpha".to_string())),
            StatusCode::CONFLICT,
        );
        assert_eq!(
            error_to_status(&Error::Registry("bad yaml".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
    }

    #[test]
    fn internal_errors_hide_detail() {
        let (status, Json(body)) = error_reply(
            &Error::Registry("sensitive".to_string()),
            "error building application",
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.detail, "error building application");
    }
}
