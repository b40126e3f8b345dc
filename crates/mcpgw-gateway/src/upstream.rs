//! Shared outbound HTTP client.
//!
//! One `reqwest::Client` (and its connection pool) serves every bridge and
//! forwarder. [`Upstream::close`] releases it exactly once at shutdown;
//! afterwards new sessions and forwards fail with
//! [`GatewayError::UpstreamUnavailable`].

use std::time::Duration;

use mcpgw_core::{GatewayError, Result};
use parking_lot::RwLock;
use tracing::info;

/// Owner of the shared outbound client.
#[derive(Debug)]
pub struct Upstream {
    client: RwLock<Option<reqwest::Client>>,
}

impl Upstream {
    /// Build the shared client.
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("mcpgw/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::from_client(client))
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client: RwLock::new(Some(client)),
        }
    }

    /// A handle to the shared pool.
    pub fn client(&self) -> Result<reqwest::Client> {
        self.client
            .read()
            .clone()
            .ok_or_else(|| GatewayError::UpstreamUnavailable("gateway is shutting down".into()))
    }

    /// Release the client. Returns `false` if it was already released.
    pub fn close(&self) -> bool {
        let released = self.client.write().take().is_some();
        if released {
            info!("upstream client released");
        }
        released
    }

    /// Whether [`Upstream::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.client.read().is_none()
    }
}
