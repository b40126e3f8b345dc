//! Server configuration.

use std::time::Duration;

use mcpgw_gateway::GatewayConfig;
use mcpgw_settings::GatewaySettings;

/// Configuration for the gateway HTTP server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Upper bound on draining in-flight requests at shutdown.
    pub shutdown_timeout: Duration,
    /// Session engine tunables.
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            shutdown_timeout: Duration::from_secs(10),
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Derive from loaded settings.
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        let gateway = GatewayConfig {
            heartbeat_interval: settings.sessions.heartbeat_interval(),
            buffer_capacity: settings.sessions.buffer_capacity,
            request_timeout: settings.upstream.request_timeout(),
            connect_timeout: settings.upstream.connect_timeout(),
            stream_count: settings.upstream.stream_count,
        };
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            shutdown_timeout: settings.server.shutdown_timeout(),
            gateway: gateway.with_buffer_capacity(settings.sessions.buffer_capacity),
        }
    }

    /// `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
