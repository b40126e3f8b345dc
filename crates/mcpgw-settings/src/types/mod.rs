//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a settings
//! file only needs the keys it wants to change. Each type implements
//! [`Default`] with production values.

mod gateway;
mod math;

pub use gateway::*;
pub use math::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the gateway and the bundled math backend.
///
/// # JSON Format
///
/// ```json
/// {
///   "server": { "port": 9000 },
///   "sessions": { "heartbeatIntervalSecs": 5 },
///   "logging": { "level": "debug", "format": "json" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySettings {
    /// Gateway listener.
    pub server: ServerSettings,
    /// Session buffering and keep-alive.
    pub sessions: SessionSettings,
    /// Outbound calls to backends.
    pub upstream: UpstreamSettings,
    /// Log output.
    pub logging: LoggingSettings,
    /// Bundled math backend.
    pub math: MathSettings,
}

impl GatewaySettings {
    /// Reject values that deserialize fine but cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.sessions.heartbeat_interval_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "sessions.heartbeatIntervalSecs must be at least 1".into(),
            ));
        }
        if self.sessions.buffer_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "sessions.bufferCapacity must be at least 1".into(),
            ));
        }
        if self.upstream.request_timeout_ms == 0 || self.upstream.connect_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "upstream timeouts must be non-zero".into(),
            ));
        }
        if self.server.host.trim().is_empty() || self.math.host.trim().is_empty() {
            return Err(SettingsError::InvalidValue("host must not be empty".into()));
        }
        Ok(())
    }
}
