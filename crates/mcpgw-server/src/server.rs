//! Gateway server: bind, serve, and ordered shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use mcpgw_gateway::SessionManager;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::routes::{AppState, router};
use crate::shutdown::ShutdownCoordinator;

/// The gateway HTTP server, not yet bound.
pub struct GatewayServer {
    config: ServerConfig,
    manager: SessionManager,
    metrics: Option<PrometheusHandle>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl GatewayServer {
    /// Create a server over an existing session engine.
    pub fn new(config: ServerConfig, manager: SessionManager) -> Self {
        Self {
            config,
            manager,
            metrics: None,
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Create a server with a fresh in-memory engine built from `config`.
    pub fn in_memory(config: ServerConfig) -> mcpgw_core::Result<Self> {
        let manager = SessionManager::in_memory(config.gateway.clone())?;
        Ok(Self::new(config, manager))
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// The session engine.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// The full router with tracing and CORS layers.
    pub fn router(&self) -> Router {
        let mut state = AppState::new(self.manager.clone());
        state.metrics.clone_from(&self.metrics);
        router(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the listener and start serving in the background.
    pub async fn start(self) -> std::io::Result<ServerHandle> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(e) = result {
                error!(error = %e, "gateway server error");
            }
        });

        info!(%addr, "gateway listening");
        Ok(ServerHandle {
            addr,
            manager: self.manager,
            shutdown: self.shutdown,
            shutdown_timeout: self.config.shutdown_timeout,
            server,
        })
    }
}

/// A running gateway server.
pub struct ServerHandle {
    addr: SocketAddr,
    manager: SessionManager,
    shutdown: Arc<ShutdownCoordinator>,
    shutdown_timeout: Duration,
    server: JoinHandle<()>,
}

impl ServerHandle {
    /// Bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://<addr>` for clients.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The session engine behind the server.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Token that stops the listener when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.token()
    }

    /// Stop the server.
    ///
    /// The listener stops accepting first. Live sessions are then torn down,
    /// which ends their event streams so the drain can finish. Once requests
    /// have drained (or the timeout passed) the shared client is released and
    /// the registry cleared.
    pub async fn shutdown(self) {
        self.shutdown.shutdown();
        let closed = self.manager.shutdown_all().await;
        info!(sessions = closed, "sessions torn down");

        let drained = self
            .shutdown
            .drain(vec![self.server], self.shutdown_timeout)
            .await;
        // Sweeps sessions opened by requests that were still draining.
        self.manager.shutdown().await;
        info!(drained, "gateway stopped");
    }
}
