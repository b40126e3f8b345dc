//! Math backend HTTP server.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::ops::{MathError, MathResult, Operands, Operation};
use crate::stream::{DEFAULT_COUNT, progress_events};

/// Math backend configuration.
#[derive(Clone, Debug)]
pub struct MathConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Delay between stream events.
    pub stream_interval: Duration,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            stream_interval: Duration::from_millis(800),
        }
    }
}

#[derive(Clone)]
struct MathState {
    stream_interval: Duration,
}

/// `GET /stream` query.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Number of progress events.
    pub n: Option<u32>,
}

impl IntoResponse for MathError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::DivisionByZero => StatusCode::BAD_REQUEST,
            Self::UnknownOperation(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

/// Build the math router.
pub fn router(config: &MathConfig) -> Router {
    Router::new()
        .route("/math/{op}", post(calculate))
        .route("/stream", get(stream))
        .with_state(MathState {
            stream_interval: config.stream_interval,
        })
}

async fn calculate(
    Path(op): Path<String>,
    Json(operands): Json<Operands>,
) -> Result<Json<MathResult>, MathError> {
    let op: Operation = op.parse()?;
    let result = op.apply(operands)?;
    debug!(%op, a = operands.a, b = operands.b, result, "calculated");
    Ok(Json(MathResult { result }))
}

async fn stream(
    State(state): State<MathState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let n = query.n.unwrap_or(DEFAULT_COUNT);
    debug!(n, "stream opened");
    Sse::new(progress_events(n, state.stream_interval).map(|v| Event::default().json_data(v)))
}

/// The math backend, not yet bound.
pub struct MathServer {
    config: MathConfig,
}

impl MathServer {
    /// Create a server.
    pub fn new(config: MathConfig) -> Self {
        Self { config }
    }

    /// Bind the listener and start serving in the background.
    pub async fn start(self) -> std::io::Result<MathHandle> {
        let bind = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(bind).await?;
        let addr = listener.local_addr()?;
        let app = router(&self.config).layer(TraceLayer::new_for_http());
        let token = CancellationToken::new();
        let stop = token.clone();

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await;
            if let Err(e) = result {
                error!(error = %e, "math server error");
            }
        });

        info!(%addr, "math backend listening");
        Ok(MathHandle {
            addr,
            token,
            server,
        })
    }
}

/// A running math backend.
pub struct MathHandle {
    addr: SocketAddr,
    token: CancellationToken,
    server: JoinHandle<()>,
}

impl MathHandle {
    /// Bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://<addr>` for registration.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting, then wait up to `timeout` for open requests.
    pub async fn shutdown(self, timeout: Duration) {
        self.token.cancel();
        if tokio::time::timeout(timeout, self.server).await.is_err() {
            debug!("math backend drain timed out");
        }
    }
}
