//! Axum-based HTTP gateway: the only inbound surface of the agent.
//!
//! Every mutating or file-touching route requires the configured bearer
//! token; request bodies are size-limited and requests time out server-side,
//! so a misbehaving caller cannot hold a connection open indefinitely.

mod auth;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::Config;
use crate::error::{ConfigError, GatewayError, GuardError};
use crate::process::Pm2Client;
use crate::security::SecurityPolicy;

/// Maximum request body size (64KB) — prevents memory exhaustion.
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s) — prevents slow-loris attacks.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers. Cheap to clone; the policy is
/// immutable, so handlers share it without locking.
#[derive(Clone)]
pub struct AppState {
    pub security: Arc<SecurityPolicy>,
    pub pm2: Arc<Pm2Client>,
    pub auth_token: Arc<str>,
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/v1/run", post(handlers::handle_run))
        .route("/v1/logs/grep", post(handlers::handle_grep))
        .route("/v1/logs/metrics", post(handlers::handle_metrics))
        .route("/v1/processes", get(handlers::handle_list_processes))
        .route("/v1/processes/{name}", get(handlers::handle_describe_process))
        .route(
            "/v1/processes/{name}/{action}",
            post(handlers::handle_process_action),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .with_state(state)
}

/// Run the gateway until the process is stopped. Fails fast on invalid
/// startup configuration.
pub async fn run_gateway(config: &Config) -> Result<(), GuardError> {
    config.validate_for_serve().map_err(GuardError::Config)?;

    let security = SecurityPolicy::new(
        config.sandbox.allowed_commands.clone(),
        config.sandbox.allowed_paths.clone(),
    )
    .map_err(|err| GuardError::Config(ConfigError::Validation(err.to_string())))?;

    let token = config
        .auth_token
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_string();

    let state = AppState {
        security: Arc::new(security),
        pm2: Arc::new(Pm2Client::new()),
        auth_token: Arc::from(token),
    };

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|err| GatewayError::Bind {
            addr: addr.clone(),
            message: err.to_string(),
        })
        .map_err(GuardError::Gateway)?;

    tracing::info!(
        %addr,
        roots = ?state.security.allowed_roots,
        "guardpost gateway listening"
    );

    axum::serve(listener, router(state))
        .await
        .map_err(|err| GuardError::Gateway(GatewayError::Serve(err.to_string())))
}
