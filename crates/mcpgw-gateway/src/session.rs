//! Session records and the session store.
//!
//! A [`Session`] owns the read end of its payload buffer and the handle to
//! its bridge task. The buffer's receiver sits behind an async mutex so at
//! most one client stream drains it at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mcpgw_core::{GatewayError, Result, SessionId};
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, mpsc};

use crate::bridge::BridgeHandle;

/// Exclusive read access to a session's payload buffer.
pub type BufferReader = OwnedMutexGuard<mpsc::Receiver<String>>;

/// One active client-to-backend streaming relationship.
pub struct Session {
    id: SessionId,
    backend: String,
    created_at: DateTime<Utc>,
    buffer: Arc<AsyncMutex<mpsc::Receiver<String>>>,
    bridge: parking_lot::Mutex<Option<BridgeHandle>>,
}

impl Session {
    /// Create a session around an already-spawned bridge.
    pub fn new(
        id: SessionId,
        backend: impl Into<String>,
        buffer: mpsc::Receiver<String>,
        bridge: BridgeHandle,
    ) -> Self {
        Self {
            id,
            backend: backend.into(),
            created_at: Utc::now(),
            buffer: Arc::new(AsyncMutex::new(buffer)),
            bridge: parking_lot::Mutex::new(Some(bridge)),
        }
    }

    /// Session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Name of the backend this session was opened against.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Take exclusive read access to the buffer.
    ///
    /// Fails with [`GatewayError::SessionBusy`] while another client stream
    /// holds it.
    pub fn attach(&self) -> Result<BufferReader> {
        Arc::clone(&self.buffer)
            .try_lock_owned()
            .map_err(|_| GatewayError::SessionBusy(self.id.to_string()))
    }

    /// Request bridge cancellation and take its handle for awaiting.
    ///
    /// Only the first caller gets the handle. Cancellation is requested
    /// under the lock, so later callers can rely on it already being
    /// signalled.
    pub fn cancel_bridge(&self) -> Option<BridgeHandle> {
        let mut slot = self.bridge.lock();
        let handle = slot.take()?;
        handle.cancel();
        Some(handle)
    }

    /// Whether the bridge task is still attached and running.
    pub fn bridge_running(&self) -> bool {
        self.bridge
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Serializable summary.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id.clone(),
            server: self.backend.clone(),
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("backend", &self.backend)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Wire summary of a session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionInfo {
    /// Session ID.
    pub session_id: SessionId,
    /// Backend name.
    pub server: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Storage for live sessions.
pub trait SessionStore: Send + Sync {
    /// Insert a session, replacing nothing (IDs are unique).
    fn insert(&self, session: Arc<Session>);
    /// Look up a session.
    fn get(&self, id: &SessionId) -> Option<Arc<Session>>;
    /// Remove and return a session.
    fn remove(&self, id: &SessionId) -> Option<Arc<Session>>;
    /// IDs of every live session.
    fn ids(&self) -> Vec<SessionId>;
    /// Every live session.
    fn list(&self) -> Vec<Arc<Session>>;
    /// Number of live sessions.
    fn len(&self) -> usize;
    /// Whether no session is live.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process [`SessionStore`] with per-key locking.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, session: Arc<Session>) {
        let _ = self.sessions.insert(session.id().clone(), session);
    }

    fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|s| Arc::clone(s.value()))
    }

    fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.remove(id).map(|(_, s)| s)
    }

    fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|s| s.key().clone()).collect()
    }

    fn list(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|s| Arc::clone(s.value())).collect()
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}
