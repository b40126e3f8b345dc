//! # mcpgw-core
//!
//! Foundation types shared by every mcpgw crate:
//!
//! - **IDs**: [`SessionId`] as an opaque, time-ordered newtype
//! - **Errors**: [`GatewayError`] taxonomy with HTTP status and wire codes
//! - **Logging**: one-shot `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;

pub use errors::{GatewayError, Result};
pub use ids::SessionId;
pub use logging::{LogFormat, init_subscriber};
