//! Admission handlers for the relay server.
//!
//! Each endpoint upgrades the request to a WebSocket and hands the socket to
//! the hub. Nothing here touches the registry directly.

use crate::config::{Config, HEALTH_PATH};
use crate::metrics;
use anyhow::Result;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use plotrelay_core::{Hub, Role};
use plotrelay_transport::AxumConnection;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Shared server state.
pub struct AppState {
    /// The connection hub.
    pub hub: Hub,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state, starting the hub.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            hub: Hub::start(config.hub.hub_config()),
            config,
        }
    }
}

/// Build the HTTP router.
///
/// # Panics
///
/// Panics if the endpoint paths are malformed or collide. Configs from
/// [`Config::load`] are already checked; others can use [`Config::validate`].
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route(&state.config.endpoints.provider_path, get(provider_handler))
        .route(&state.config.endpoints.observer_path, get(observer_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(state)
}

/// Serve the relay on an already bound listener.
///
/// # Errors
///
/// Returns an error if the server stops with an I/O error.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let app = app(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the server fails to
/// start.
pub async fn run_server(config: Config) -> Result<()> {
    config.validate()?;

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::new(config));

    // Bind and serve
    let listener = TcpListener::bind(addr).await?;

    info!("Relay server listening on {}", addr);
    info!(
        "Provider endpoint: ws://{}{}",
        addr, state.config.endpoints.provider_path
    );
    info!(
        "Observer endpoint: ws://{}{}",
        addr, state.config.endpoints.observer_path
    );

    serve(listener, state).await
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.hub.snapshot().await {
        Ok(snapshot) => Json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "providers": snapshot.providers.len(),
            "observers": snapshot.observers.len(),
        }))
        .into_response(),
        Err(e) => failed(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

/// Provider upgrade handler.
async fn provider_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    admit(state, addr, upgrade, Role::Provider)
}

/// Observer upgrade handler.
async fn observer_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    admit(state, addr, upgrade, Role::Observer)
}

/// Upgrade the request and register the socket under `role`.
fn admit(
    state: Arc<AppState>,
    addr: SocketAddr,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    role: Role,
) -> Response {
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(remote = %addr, endpoint = %role, error = %rejection, "Cannot upgrade connection");
            metrics::record_rejection(role);
            return failed(rejection.status(), rejection.body_text());
        }
    };

    let max_message_size = state.config.limits.max_message_size;

    ws.max_message_size(max_message_size)
        .on_failed_upgrade(move |e| {
            warn!(remote = %addr, endpoint = %role, error = %e, "WebSocket upgrade failed");
            metrics::record_upgrade_failure(role);
        })
        .on_upgrade(move |socket| async move {
            let connection = Box::new(
                AxumConnection::new(socket, max_message_size).with_remote_addr(addr.to_string()),
            );

            let registered = match role {
                Role::Provider => state.hub.register_provider(connection),
                Role::Observer => state.hub.register_observer(connection),
            };

            match registered {
                Ok(id) => {
                    info!(connection = %id, remote = %addr, endpoint = %role, "Admitted connection")
                }
                Err(e) => {
                    error!(remote = %addr, endpoint = %role, error = %e, "Admission failed")
                }
            }
        })
}

/// Structured failure body.
fn failed(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Json(serde_json::json!({
        "status": "failed",
        "message": message.into(),
    }));
    (status, body).into_response()
}
