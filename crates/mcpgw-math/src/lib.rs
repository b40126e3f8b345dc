//! # mcpgw-math
//!
//! Sample backend for the gateway: four arithmetic endpoints under `/math/`
//! and a paced progress stream at `/stream?n=<count>`.

#![deny(unsafe_code)]

pub mod ops;
pub mod server;
pub mod stream;

pub use ops::{MathError, MathResult, Operands, Operation};
pub use server::{MathConfig, MathHandle, MathServer, router};
pub use stream::progress_events;
