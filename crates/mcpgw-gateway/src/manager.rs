//! Session lifecycle manager.
//!
//! Creates sessions (spawning their bridge as the last fallible step),
//! attaches client streams, forwards requests, and tears sessions down.
//! Teardown signals the bridge, waits for it to exit, and only then removes
//! the session. It is idempotent and safe to call from every termination
//! path at once.

use std::sync::Arc;

use futures::Stream;
use mcpgw_core::{GatewayError, Result, SessionId};
use metrics::{counter, gauge};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::bridge::{BridgeContext, spawn_bridge};
use crate::config::GatewayConfig;
use crate::emitter::{Frame, client_stream};
use crate::forwarder::Forwarder;
use crate::registry::Registry;
use crate::session::{InMemorySessionStore, Session, SessionInfo, SessionStore};
use crate::telemetry::{SESSIONS_ACTIVE, SESSIONS_CREATED_TOTAL};
use crate::upstream::Upstream;

struct ManagerInner {
    registry: Registry,
    sessions: Arc<dyn SessionStore>,
    upstream: Arc<Upstream>,
    forwarder: Forwarder,
    config: GatewayConfig,
}

/// Cheaply cloneable handle to the session engine.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.inner.sessions.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Assemble a manager from explicit parts.
    pub fn new(
        registry: Registry,
        sessions: Arc<dyn SessionStore>,
        upstream: Arc<Upstream>,
        config: GatewayConfig,
    ) -> Self {
        let forwarder = Forwarder::new(
            registry.clone(),
            Arc::clone(&sessions),
            Arc::clone(&upstream),
            config.request_timeout,
        );
        Self {
            inner: Arc::new(ManagerInner {
                registry,
                sessions,
                upstream,
                forwarder,
                config,
            }),
        }
    }

    /// In-memory stores and a fresh outbound client.
    pub fn in_memory(config: GatewayConfig) -> Result<Self> {
        let upstream = Arc::new(Upstream::new(config.connect_timeout)?);
        Ok(Self::new(
            Registry::default(),
            Arc::new(InMemorySessionStore::new()),
            upstream,
            config,
        ))
    }

    /// Backend registry.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Engine configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Open a session against a registered backend.
    #[instrument(skip(self))]
    pub fn connect(&self, backend: &str) -> Result<SessionId> {
        let backend = backend.trim();
        if self.inner.registry.get(backend).is_none() {
            return Err(GatewayError::BackendNotFound(backend.to_string()));
        }
        let client = self.inner.upstream.client()?;

        let session_id = SessionId::new();
        let (sender, receiver) = mpsc::channel(self.inner.config.buffer_capacity);
        let bridge = spawn_bridge(BridgeContext {
            session_id: session_id.clone(),
            backend: backend.to_string(),
            registry: self.inner.registry.clone(),
            client,
            sender,
            stream_count: self.inner.config.stream_count,
        });
        self.inner.sessions.insert(Arc::new(Session::new(
            session_id.clone(),
            backend,
            receiver,
            bridge,
        )));

        counter!(SESSIONS_CREATED_TOTAL, "backend" => backend.to_string()).increment(1);
        gauge!(SESSIONS_ACTIVE).increment(1.0);
        info!(session_id = %session_id, backend, "session created");
        Ok(session_id)
    }

    /// Tear a session down. Returns `true` if this call removed it.
    ///
    /// Unknown IDs are a no-op. When calls race, the one that took the
    /// bridge handle awaits the bridge and removes the session; the others
    /// return `false` straight away. The wait-then-remove step runs on its
    /// own task, so it completes even if the caller's future is dropped.
    pub async fn teardown(&self, session_id: &SessionId) -> bool {
        let Some(session) = self.inner.sessions.get(session_id) else {
            return false;
        };
        let Some(bridge) = session.cancel_bridge() else {
            return false;
        };
        let manager = self.clone();
        let finish = tokio::spawn(async move {
            bridge.shutdown().await;
            manager.remove_session(&session)
        });
        finish.await.unwrap_or(false)
    }

    fn remove_session(&self, session: &Session) -> bool {
        if self.inner.sessions.remove(session.id()).is_none() {
            return false;
        }
        gauge!(SESSIONS_ACTIVE).decrement(1.0);
        info!(session_id = %session.id(), backend = %session.backend(), "session closed");
        true
    }

    /// Attach a client stream to a session.
    ///
    /// Fails with [`GatewayError::SessionNotFound`] or, if another client is
    /// attached, [`GatewayError::SessionBusy`].
    pub fn open_stream(
        &self,
        session_id: &SessionId,
    ) -> Result<impl Stream<Item = Frame> + Send + 'static> {
        let session = self
            .inner
            .sessions
            .get(session_id)
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))?;
        let reader = session.attach()?;
        debug!(session_id = %session_id, "client stream attached");
        Ok(client_stream(
            self.clone(),
            session_id.clone(),
            reader,
            self.inner.config.heartbeat_interval,
        ))
    }

    /// Forward one request to the session's backend.
    pub async fn forward(&self, session_id: &SessionId, method: &str, body: Value) -> Result<Value> {
        self.inner.forwarder.forward(session_id, method, body).await
    }

    /// Look up a live session.
    pub fn session(&self, session_id: &SessionId) -> Option<Arc<Session>> {
        self.inner.sessions.get(session_id)
    }

    /// Summaries of every live session, oldest first.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .inner
            .sessions
            .list()
            .iter()
            .map(|s| s.info())
            .collect();
        infos.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        infos
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Tear down every live session concurrently. Returns how many were removed.
    pub async fn shutdown_all(&self) -> usize {
        let ids = self.inner.sessions.ids();
        let results =
            futures::future::join_all(ids.iter().map(|id| self.teardown(id))).await;
        results.into_iter().filter(|removed| *removed).count()
    }

    /// Release the outbound client and clear the registry.
    ///
    /// Call after [`SessionManager::shutdown_all`], once no bridge can still
    /// be using the pool.
    pub fn release(&self) {
        let _ = self.inner.upstream.close();
        self.inner.registry.clear();
    }

    /// Full engine shutdown: sessions first, then shared resources.
    pub async fn shutdown(&self) {
        let closed = self.shutdown_all().await;
        info!(sessions = closed, "all sessions torn down");
        self.release();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
