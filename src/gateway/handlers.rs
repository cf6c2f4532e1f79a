use std::collections::BTreeMap;
use std::path::PathBuf;

use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use super::auth::bearer_token_matches;
use crate::logs;
use crate::process::{ProcessAction, ProcessError};
use crate::security::{ScreenedPattern, screen_pattern};
use crate::{executor, security::Verdict};

fn default_context_lines() -> usize {
    3
}

fn default_max_matches() -> usize {
    50
}

fn default_window_lines() -> usize {
    200
}

#[derive(Deserialize)]
pub(super) struct RunRequest {
    pub command: String,
    pub cwd: Option<PathBuf>,
}

#[derive(Deserialize)]
pub(super) struct GrepRequest {
    pub path: PathBuf,
    pub pattern: String,
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
}

#[derive(Deserialize)]
pub(super) struct MetricsRequest {
    pub path: PathBuf,
    pub patterns: BTreeMap<String, String>,
    #[serde(default = "default_window_lines")]
    pub window_lines: usize,
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "missing or invalid bearer token"})),
    )
        .into_response()
}

fn bad_request(reason: impl AsRef<str>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": reason.as_ref()})),
    )
        .into_response()
}

/// A policy denial: 403 with the reason, so the caller can self-correct.
fn denied(reason: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"error": "denied by sandbox policy", "reason": reason})),
    )
        .into_response()
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    if bearer_token_matches(headers, &state.auth_token) {
        Ok(())
    } else {
        tracing::warn!("request rejected: missing or invalid bearer token");
        Err(unauthorized())
    }
}

fn process_error_response(err: &ProcessError) -> Response {
    let status = match err {
        ProcessError::InvalidName(_) => StatusCode::BAD_REQUEST,
        ProcessError::NotFound(_) => StatusCode::NOT_FOUND,
        ProcessError::Unreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ProcessError::CommandFailed { .. } | ProcessError::Malformed(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    (status, Json(json!({"error": err.to_string()}))).into_response()
}

/// GET /health — always public (no secrets leaked)
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// POST /v1/run — validate a command line, then execute it.
pub(super) async fn handle_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RunRequest>, axum::extract::rejection::JsonRejection>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let Json(request) = match body {
        Ok(body) => body,
        Err(err) => return bad_request(format!("invalid JSON body: {err}")),
    };

    let cwd = request.cwd.as_deref();
    match state.security.validate_command(&request.command, cwd) {
        Verdict::Denied(reason) => {
            tracing::info!(command = %request.command, %reason, "command denied");
            denied(&reason)
        }
        Verdict::Permitted => {
            tracing::info!(command = %request.command, "command permitted, executing");
            let outcome = executor::run_validated(&request.command, cwd).await;
            Json(outcome).into_response()
        }
    }
}

/// POST /v1/logs/grep — search a confined log file with a screened pattern.
pub(super) async fn handle_grep(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<GrepRequest>, axum::extract::rejection::JsonRejection>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let Json(request) = match body {
        Ok(body) => body,
        Err(err) => return bad_request(format!("invalid JSON body: {err}")),
    };
    if request.max_matches == 0 {
        return bad_request("max_matches must be positive");
    }

    let path_str = request.path.to_string_lossy();
    if let Verdict::Denied(reason) = state.security.confine_path(&path_str, None) {
        return denied(&reason);
    }
    let pattern = match screen_pattern(&request.pattern) {
        Ok(pattern) => pattern,
        Err(rejection) => return denied(&rejection.to_string()),
    };

    let matches = logs::grep_log_async(
        request.path,
        pattern,
        request.context_lines,
        request.max_matches,
    )
    .await;
    Json(json!({"matches": matches})).into_response()
}

/// POST /v1/logs/metrics — extract named metrics from a confined log's tail.
pub(super) async fn handle_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<MetricsRequest>, axum::extract::rejection::JsonRejection>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let Json(request) = match body {
        Ok(body) => body,
        Err(err) => return bad_request(format!("invalid JSON body: {err}")),
    };
    if request.window_lines == 0 {
        return bad_request("window_lines must be positive");
    }

    let path_str = request.path.to_string_lossy();
    if let Verdict::Denied(reason) = state.security.confine_path(&path_str, None) {
        return denied(&reason);
    }

    let mut patterns: Vec<(String, ScreenedPattern)> = Vec::with_capacity(request.patterns.len());
    for (name, raw) in &request.patterns {
        match screen_pattern(raw) {
            Ok(pattern) => patterns.push((name.clone(), pattern)),
            Err(rejection) => {
                return denied(&format!("pattern for metric '{name}': {rejection}"));
            }
        }
    }

    match logs::extract_metrics_async(request.path, patterns, request.window_lines).await {
        Ok(metrics) => Json(json!({"metrics": metrics})).into_response(),
        Err(err) => bad_request(err.to_string()),
    }
}

/// GET /v1/processes — all managed processes.
pub(super) async fn handle_list_processes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    match state.pm2.list().await {
        Ok(processes) => Json(json!({"processes": processes})).into_response(),
        Err(err) => process_error_response(&err),
    }
}

/// GET /v1/processes/{name} — one managed process.
pub(super) async fn handle_describe_process(
    State(state): State<AppState>,
    headers: HeaderMap,
    UrlPath(name): UrlPath<String>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    match state.pm2.describe(&name).await {
        Ok(process) => Json(process).into_response(),
        Err(err) => process_error_response(&err),
    }
}

/// POST /v1/processes/{name}/{action} — start|stop|restart.
pub(super) async fn handle_process_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    UrlPath((name, action)): UrlPath<(String, String)>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let action = match action.as_str() {
        "start" => ProcessAction::Start,
        "stop" => ProcessAction::Stop,
        "restart" => ProcessAction::Restart,
        other => return bad_request(format!("unknown action '{other}'")),
    };
    match state.pm2.dispatch(action, &name).await {
        Ok(()) => Json(json!({"ok": true, "process": name})).into_response(),
        Err(err) => process_error_response(&err),
    }
}
