//! HTTP routes and shared handler state.

mod control;
mod data;

use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use mcpgw_gateway::SessionManager;
use metrics_exporter_prometheus::PrometheusHandle;

pub use control::{
    ListResponse, RegisterRequest, RegisterResponse, UnregisterRequest, UnregisterResponse,
};
pub use data::{CloseResponse, ConnectRequest, ConnectResponse, SessionsResponse};

use crate::health::{HealthResponse, health_check};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Session engine (owns the registry).
    pub manager: SessionManager,
    /// Server start, for uptime.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State without a metrics recorder.
    pub fn new(manager: SessionManager) -> Self {
        Self {
            manager,
            start_time: Instant::now(),
            metrics: None,
        }
    }
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/control/register", post(control::register))
        .route("/control/unregister", post(control::unregister))
        .route("/control/list", get(control::list))
        .route("/data/connect", post(data::connect))
        .route("/data/stream/{id}", get(data::stream))
        .route("/data/request/{id}/{method}", post(data::request))
        .route("/data/close/{id}", post(data::close))
        .route("/data/sessions", get(data::sessions))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_check(
        state.start_time,
        state.manager.registry().len(),
        state.manager.session_count(),
    ))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::render(state.metrics.as_ref()),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
