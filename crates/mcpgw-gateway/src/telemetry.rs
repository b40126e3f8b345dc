//! Metric name constants recorded by the gateway engine.
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op. The server crate installs the Prometheus
//! recorder and renders `/metrics`.

/// Sessions created (counter, labels: backend).
pub const SESSIONS_CREATED_TOTAL: &str = "gateway_sessions_created_total";
/// Live sessions (gauge).
pub const SESSIONS_ACTIVE: &str = "gateway_sessions_active";
/// Bridges that ended with a backend fault (counter).
pub const BRIDGE_ERRORS_TOTAL: &str = "gateway_bridge_errors_total";
/// Forwarded requests (counter, labels: method).
pub const FORWARD_REQUESTS_TOTAL: &str = "gateway_forward_requests_total";
/// Forwarded requests that failed (counter, labels: method, code).
pub const FORWARD_ERRORS_TOTAL: &str = "gateway_forward_errors_total";
/// Keep-alive frames sent to clients (counter).
pub const HEARTBEATS_TOTAL: &str = "gateway_heartbeats_total";

/// Every metric name, for exporters and tests.
pub const ALL: [&str; 6] = [
    SESSIONS_CREATED_TOTAL,
    SESSIONS_ACTIVE,
    BRIDGE_ERRORS_TOTAL,
    FORWARD_REQUESTS_TOTAL,
    FORWARD_ERRORS_TOTAL,
    HEARTBEATS_TOTAL,
];
