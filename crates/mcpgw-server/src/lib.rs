//! # mcpgw-server
//!
//! Axum HTTP surface for the gateway.
//!
//! - `/control/*`: backend registration
//! - `/data/*`: sessions, event streams, forwarded requests
//! - `/health` and `/metrics`
//!
//! [`GatewayServer::start`] binds and serves in the background;
//! [`ServerHandle::shutdown`] stops it in order (listener, sessions, drain,
//! shared resources).

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::{AppState, router};
pub use server::{GatewayServer, ServerHandle};
pub use shutdown::ShutdownCoordinator;
