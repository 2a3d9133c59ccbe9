//! `ParleyServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use parley_core::SessionIds;
use parley_protocol::SessionConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::dial::UpstreamDialer;
use crate::health::{self, HealthResponse};
use crate::hub::{Hub, HubHandle};
use crate::metrics as names;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::frame;
use crate::websocket::session::{SessionContext, run_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Hub handle for new sessions and stats.
    pub hub: HubHandle,
    /// Opens the upstream half of each session.
    pub dialer: Arc<dyn UpstreamDialer>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Configuration sent to the service for every session.
    pub session_config: Arc<SessionConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, if a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The relay server.
pub struct ParleyServer {
    config: Arc<ServerConfig>,
    session_config: Arc<SessionConfig>,
    dialer: Arc<dyn UpstreamDialer>,
    hub: HubHandle,
    hub_task: JoinHandle<()>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl ParleyServer {
    /// Create a server and start its hub loop. Must be called inside a Tokio runtime.
    pub fn new(
        config: ServerConfig,
        session_config: SessionConfig,
        dialer: Arc<dyn UpstreamDialer>,
    ) -> Self {
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let (hub, handle) = Hub::new(config.hub_capacity);
        let hub_task = tokio::spawn(hub.run(shutdown.token()));
        Self {
            config: Arc::new(config),
            session_config: Arc::new(session_config),
            dialer,
            hub: handle,
            hub_task,
            shutdown,
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from this recorder handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: self.hub.clone(),
            dialer: self.dialer.clone(),
            shutdown: self.shutdown.clone(),
            config: self.config.clone(),
            session_config: self.session_config.clone(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/api/v1/ws", get(ws_handler))
            .route("/ws", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();
        info!(%addr, "parley listening");

        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                token.cancelled().await;
            });
            if let Err(e) = serve.await {
                error!(error = %e, "server error");
            }
        });
        Ok((addr, task))
    }

    /// Stop accepting sessions, cancel live ones and wait for them to drain.
    pub async fn shutdown_gracefully(self, server_task: JoinHandle<()>) {
        info!("shutting down");
        self.shutdown
            .graceful_shutdown(vec![server_task, self.hub_task], Some(self.config.shutdown_grace))
            .await;
        info!("shutdown complete");
    }

    /// Get the hub handle.
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.hub.stats().await.unwrap_or_default();
    Json(health::health_check(state.start_time, stats))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => crate::metrics::render(handle).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// GET /api/v1/ws
///
/// Dials upstream first; the client upgrade only completes once there is a
/// service to relay to.
async fn ws_handler(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if state.shutdown.is_shutting_down() {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "server is shutting down");
    }
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(error = %rejection, "websocket upgrade rejected");
            return rejection.into_response();
        }
    };

    let ids = SessionIds::generate();
    let upstream = match state.dialer.dial().await {
        Ok(upstream) => upstream,
        Err(e) => {
            counter!(names::UPSTREAM_DIAL_FAILURES_TOTAL).increment(1);
            warn!(
                client_id = %ids.client,
                error = %e,
                category = %e.category(),
                "upstream dial failed"
            );
            return error_response(StatusCode::BAD_GATEWAY, e.to_string());
        }
    };

    let ctx = SessionContext {
        hub: state.hub.clone(),
        keepalive: state.config.keepalive(),
        queue_capacity: state.config.queue_capacity,
        session_config: (*state.session_config).clone(),
        shutdown: state.shutdown.token(),
    };
    let tracker = state.shutdown.tracker();
    let failed_id = ids.client.clone();

    ws.max_message_size(state.config.max_message_size)
        .on_failed_upgrade(move |e| {
            warn!(client_id = %failed_id, error = %e, "client upgrade failed");
        })
        .on_upgrade(move |socket| {
            tracker.track_future(run_session(ctx, ids, frame::from_axum(socket), upstream))
        })
}
