//! Engine configuration.

use std::time::Duration;

/// Tunables for the session engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Idle time on a client stream before a keep-alive frame.
    pub heartbeat_interval: Duration,
    /// Payloads buffered per session. The bridge waits when it is full.
    pub buffer_capacity: usize,
    /// Timeout for one forwarded request.
    pub request_timeout: Duration,
    /// Connect timeout of the shared outbound client.
    pub connect_timeout: Duration,
    /// `n` requested from a backend's stream endpoint.
    pub stream_count: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            buffer_capacity: 1024,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            stream_count: 50,
        }
    }
}

impl GatewayConfig {
    /// Override the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Override the backend stream count.
    #[must_use]
    pub fn with_stream_count(mut self, count: u32) -> Self {
        self.stream_count = count;
        self
    }

    /// Override the per-session buffer capacity (minimum 1).
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }
}
