//! Backend registry (control plane).
//!
//! [`Registry`] validates and normalizes registrations and delegates storage
//! to a [`BackendStore`]. Each store operation is a single critical section,
//! so a name is either fully registered or not at all.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mcpgw_core::{GatewayError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

/// One registered backend. Never mutated after registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendEntry {
    /// Unique registry key.
    pub name: String,
    /// Base URL with trailing slashes removed.
    pub base_url: String,
    /// Opaque registrant metadata.
    #[serde(default)]
    pub meta: Map<String, Value>,
    /// When the entry was registered.
    pub registered_at: DateTime<Utc>,
}

/// Storage for backend entries.
pub trait BackendStore: Send + Sync {
    /// Insert `entry` unless its name is taken. Check and insert are atomic.
    fn insert(&self, entry: BackendEntry) -> Result<()>;
    /// Remove and return the entry for `name`.
    fn remove(&self, name: &str) -> Option<BackendEntry>;
    /// Look up one entry.
    fn get(&self, name: &str) -> Option<BackendEntry>;
    /// Point-in-time copy of every entry, keyed by name.
    fn snapshot(&self) -> BTreeMap<String, BackendEntry>;
    /// Number of entries.
    fn len(&self) -> usize;
    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Drop every entry.
    fn clear(&self);
}

/// In-process [`BackendStore`].
#[derive(Debug, Default)]
pub struct InMemoryBackendStore {
    entries: RwLock<BTreeMap<String, BackendEntry>>,
}

impl InMemoryBackendStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendStore for InMemoryBackendStore {
    fn insert(&self, entry: BackendEntry) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.contains_key(&entry.name) {
            return Err(GatewayError::DuplicateName(entry.name));
        }
        let _ = entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    fn remove(&self, name: &str) -> Option<BackendEntry> {
        self.entries.write().remove(name)
    }

    fn get(&self, name: &str) -> Option<BackendEntry> {
        self.entries.read().get(name).cloned()
    }

    fn snapshot(&self) -> BTreeMap<String, BackendEntry> {
        self.entries.read().clone()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Control-plane facade over a [`BackendStore`].
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn BackendStore>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryBackendStore::new()))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("backends", &self.store.len())
            .finish()
    }
}

impl Registry {
    /// Create a registry over `store`.
    pub fn new(store: Arc<dyn BackendStore>) -> Self {
        Self { store }
    }

    /// Register a backend.
    ///
    /// Fails with [`GatewayError::DuplicateName`] if `name` is taken (the
    /// existing entry is untouched) and [`GatewayError::InvalidInput`] for an
    /// empty name or a base URL that is not absolute `http(s)`.
    pub fn register(
        &self,
        name: &str,
        base_url: &str,
        meta: Map<String, Value>,
    ) -> Result<BackendEntry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GatewayError::InvalidInput("name must not be empty".into()));
        }
        let base_url = normalize_base_url(base_url)?;

        let entry = BackendEntry {
            name: name.to_string(),
            base_url,
            meta,
            registered_at: Utc::now(),
        };
        self.store.insert(entry.clone())?;
        info!(backend = %entry.name, base_url = %entry.base_url, "backend registered");
        Ok(entry)
    }

    /// Remove a backend. Sessions already bound to it keep running.
    ///
    /// `name` is trimmed the same way [`Registry::register`] trims it.
    pub fn unregister(&self, name: &str) -> Result<BackendEntry> {
        let name = name.trim();
        let entry = self
            .store
            .remove(name)
            .ok_or_else(|| GatewayError::BackendNotFound(name.to_string()))?;
        info!(backend = %name, "backend unregistered");
        Ok(entry)
    }

    /// Look up one backend.
    pub fn get(&self, name: &str) -> Option<BackendEntry> {
        self.store.get(name.trim())
    }

    /// Current base URL for `name`.
    pub fn resolve(&self, name: &str) -> Result<String> {
        let name = name.trim();
        self.store
            .get(name)
            .map(|e| e.base_url)
            .ok_or_else(|| GatewayError::BackendNotFound(name.to_string()))
    }

    /// Snapshot of every registered backend.
    pub fn list(&self) -> BTreeMap<String, BackendEntry> {
        self.store.snapshot()
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no backend is registered.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.store.clear();
    }
}

/// Validate a base URL and strip trailing slashes.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed)
        .map_err(|e| GatewayError::InvalidInput(format!("invalid base_url '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(GatewayError::InvalidInput(format!(
            "base_url '{raw}' must be an absolute http(s) URL"
        )));
    }
    Ok(trimmed.to_string())
}
