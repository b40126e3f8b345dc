//! Bundled math backend settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Math backend listener and stream pacing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MathSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Delay between progress events on `/stream`.
    pub stream_interval_ms: u64,
}

impl Default for MathSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            stream_interval_ms: 800,
        }
    }
}

impl MathSettings {
    /// Progress interval as a [`Duration`].
    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }
}
