//! # mcpgw-gateway
//!
//! The streaming-proxy engine behind the gateway's control and data planes.
//!
//! - [`registry`]: backend name → base URL and metadata
//! - [`session`]: session records and the session store
//! - [`bridge`]: per-session task pulling a backend's event stream into the
//!   session buffer
//! - [`emitter`]: per-client stream draining a session buffer, with
//!   heartbeats and teardown on exit
//! - [`forwarder`]: stateless request/response relay
//! - [`manager`]: session lifecycle (connect, stream, forward, teardown)
//! - [`sse`]: byte stream → `data:` payload decoder
//!
//! Everything is transport-agnostic; the HTTP surface lives in
//! `mcpgw-server`.

#![deny(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod emitter;
pub mod forwarder;
pub mod manager;
pub mod payload;
pub mod registry;
pub mod session;
pub mod sse;
pub mod telemetry;
pub mod upstream;

pub use bridge::{BridgeHandle, BridgeOutcome};
pub use config::GatewayConfig;
pub use emitter::Frame;
pub use forwarder::{Forwarder, MathMethod};
pub use manager::SessionManager;
pub use registry::{BackendEntry, BackendStore, InMemoryBackendStore, Registry};
pub use session::{InMemorySessionStore, Session, SessionInfo, SessionStore};
pub use upstream::Upstream;
