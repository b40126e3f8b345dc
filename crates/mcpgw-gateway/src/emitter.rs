//! Client stream emitter.
//!
//! Drains a session buffer into a stream of [`Frame`]s for one client
//! connection. A bounded wait on the buffer produces a heartbeat on idle.
//! The stream ends after the terminal sentinel, or when the buffer closes
//! (the bridge was cancelled), in which case a sentinel is synthesized so
//! the client always sees one.
//!
//! Teardown runs exactly once however the stream ends: inline after the
//! final frame, or from a drop guard when the client disconnects and the
//! stream is dropped mid-flight.

use std::time::Duration;

use futures::Stream;
use mcpgw_core::SessionId;
use metrics::counter;
use tracing::debug;

use crate::manager::SessionManager;
use crate::payload;
use crate::session::BufferReader;
use crate::telemetry::HEARTBEATS_TOTAL;

/// One outbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A payload, sent as `data: <payload>\n\n`.
    Data(String),
    /// Idle keep-alive, sent as `:\n\n`.
    Heartbeat,
}

impl Frame {
    /// Wire encoding as an SSE frame.
    pub fn encode(&self) -> String {
        match self {
            Self::Data(payload) => format!("data: {payload}\n\n"),
            Self::Heartbeat => ":\n\n".to_string(),
        }
    }
}

/// Build the frame stream for one attached client.
pub fn client_stream(
    manager: SessionManager,
    session_id: SessionId,
    mut reader: BufferReader,
    heartbeat: Duration,
) -> impl Stream<Item = Frame> + Send + 'static {
    // Built before the generator so a stream dropped before its first poll
    // still tears the session down.
    let mut guard = TeardownGuard::new(manager.clone(), session_id.clone());
    async_stream::stream! {
        loop {
            match tokio::time::timeout(heartbeat, reader.recv()).await {
                Err(_) => {
                    counter!(HEARTBEATS_TOTAL).increment(1);
                    yield Frame::Heartbeat;
                }
                Ok(Some(payload)) => {
                    let last = payload::is_sentinel(&payload);
                    yield Frame::Data(payload);
                    if last {
                        break;
                    }
                }
                Ok(None) => {
                    debug!(session_id = %session_id, "session buffer closed without sentinel");
                    yield Frame::Data(payload::sentinel());
                    break;
                }
            }
        }

        guard.disarm();
        drop(reader);
        let _ = manager.teardown(&session_id).await;
    }
}

/// Tears the session down if the stream is dropped before it finishes.
struct TeardownGuard {
    manager: SessionManager,
    session_id: SessionId,
    armed: bool,
}

impl TeardownGuard {
    fn new(manager: SessionManager, session_id: SessionId) -> Self {
        Self {
            manager,
            session_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let manager = self.manager.clone();
        let session_id = self.session_id.clone();
        debug!(session_id = %session_id, "client disconnected, scheduling teardown");
        let _ = runtime.spawn(async move {
            let _ = manager.teardown(&session_id).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_encoding() {
        assert_eq!(
            Frame::Data(r#"{"step":1}"#.into()).encode(),
            "data: {\"step\":1}\n\n"
        );
        assert_eq!(Frame::Heartbeat.encode(), ":\n\n");
    }
}
