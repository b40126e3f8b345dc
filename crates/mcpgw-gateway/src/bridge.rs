//! Stream bridge: one background task per session.
//!
//! The bridge opens the backend's event stream, decodes `data:` lines, and
//! pushes each payload into the session buffer in receipt order. Every
//! non-cancelled exit pushes exactly one terminal sentinel as its last
//! action. Cancellation drops the in-flight work immediately and pushes
//! nothing.
//!
//! The backend address is resolved once, when the task starts. A bridge
//! keeps streaming from that address even if the backend is unregistered
//! or re-registered elsewhere later; the request forwarder, in contrast,
//! re-resolves on every call.

use std::fmt::Display;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use mcpgw_core::SessionId;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::telemetry::BRIDGE_ERRORS_TOTAL;
use crate::payload;
use crate::registry::Registry;
use crate::sse::decode_events;

/// Cancellable handle to a running bridge task.
#[derive(Debug)]
pub struct BridgeHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl BridgeHandle {
    /// Wrap a spawned task and the token that stops it.
    pub fn new(token: CancellationToken, handle: JoinHandle<()>) -> Self {
        Self { token, handle }
    }

    /// Signal cancellation without waiting.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel and wait for the task to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        match self.handle.await {
            Err(e) if e.is_panic() => warn!(error = %e, "bridge task panicked"),
            _ => {}
        }
    }
}

/// Everything a bridge task needs.
#[derive(Clone, Debug)]
pub struct BridgeContext {
    /// Owning session.
    pub session_id: SessionId,
    /// Backend name, resolved once at task start.
    pub backend: String,
    /// Registry used for that resolution.
    pub registry: Registry,
    /// Shared outbound client.
    pub client: reqwest::Client,
    /// Write end of the session buffer.
    pub sender: mpsc::Sender<String>,
    /// `n` passed to the backend stream endpoint.
    pub stream_count: u32,
}

/// How a bridge run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// Backend sent its terminal `done` event.
    BackendDone,
    /// Backend closed the stream without a `done` event.
    Closed,
    /// Backend was not in the registry at task start.
    BackendMissing,
    /// Connection could not be established.
    ConnectFailed,
    /// Backend replied with a non-success status.
    StatusFailed,
    /// Connection broke mid-stream.
    StreamError,
    /// Session buffer was dropped; nobody is listening.
    ReceiverGone,
    /// Teardown requested cancellation.
    Cancelled,
}

impl BridgeOutcome {
    /// Whether this outcome counts as a backend fault.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::BackendMissing | Self::ConnectFailed | Self::StatusFailed | Self::StreamError
        )
    }
}

/// Spawn a bridge task. Must be the last fallible step of session creation.
pub fn spawn_bridge(ctx: BridgeContext) -> BridgeHandle {
    let token = CancellationToken::new();
    let handle = tokio::spawn(run_bridge(ctx, token.clone()));
    BridgeHandle::new(token, handle)
}

/// Run a bridge until the backend finishes, fails, or `token` is cancelled.
pub async fn run_bridge(ctx: BridgeContext, token: CancellationToken) {
    let outcome = tokio::select! {
        biased;
        () = token.cancelled() => BridgeOutcome::Cancelled,
        outcome = bridge_with_sentinel(&ctx) => outcome,
    };

    let session_id = ctx.session_id.as_str();
    match outcome {
        BridgeOutcome::Cancelled => {
            debug!(session_id, backend = %ctx.backend, "bridge cancelled");
        }
        BridgeOutcome::ReceiverGone => {
            debug!(session_id, backend = %ctx.backend, "session buffer dropped, bridge stopping");
        }
        o if o.is_error() => {
            counter!(BRIDGE_ERRORS_TOTAL).increment(1);
            warn!(
                session_id,
                backend = %ctx.backend,
                outcome = ?o,
                "bridge ended with backend fault"
            );
        }
        o => info!(session_id, backend = %ctx.backend, outcome = ?o, "bridge finished"),
    }
}

async fn bridge_with_sentinel(ctx: &BridgeContext) -> BridgeOutcome {
    let outcome = pump(ctx).await;
    seal(ctx, outcome).await
}

/// Push the terminal sentinel unless the buffer is already gone.
async fn seal(ctx: &BridgeContext, outcome: BridgeOutcome) -> BridgeOutcome {
    if outcome == BridgeOutcome::ReceiverGone {
        return outcome;
    }
    if ctx.sender.send(payload::sentinel()).await.is_err() {
        return BridgeOutcome::ReceiverGone;
    }
    outcome
}

async fn pump(ctx: &BridgeContext) -> BridgeOutcome {
    let Some(base_url) = ctx.registry.get(&ctx.backend).map(|e| e.base_url) else {
        let error = payload::backend_not_found(&ctx.backend);
        return push_or_gone(ctx, error, BridgeOutcome::BackendMissing).await;
    };

    let url = format!("{base_url}/stream");
    debug!(session_id = %ctx.session_id, %url, "opening backend stream");

    let response = match ctx
        .client
        .get(&url)
        .query(&[("n", ctx.stream_count)])
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            let error = payload::request_error(&e.to_string());
            return push_or_gone(ctx, error, BridgeOutcome::ConnectFailed).await;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let detail = status.canonical_reason().unwrap_or("unexpected status");
        let error = payload::stream_failed(status.as_u16(), detail);
        return push_or_gone(ctx, error, BridgeOutcome::StatusFailed).await;
    }

    pump_body(ctx, response.bytes_stream()).await
}

/// Relay every `data:` payload of `body` into the session buffer.
///
/// Payloads are forwarded as received, JSON or not. A read error ends the
/// run with a `request error` payload.
async fn pump_body<S, E>(ctx: &BridgeContext, body: S) -> BridgeOutcome
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Display + Send,
{
    let mut events = std::pin::pin!(decode_events(body));
    while let Some(item) = events.next().await {
        match item {
            Ok(data) => {
                if payload::is_backend_done(&data) {
                    return BridgeOutcome::BackendDone;
                }
                if ctx.sender.send(data).await.is_err() {
                    return BridgeOutcome::ReceiverGone;
                }
            }
            Err(e) => {
                let error = payload::request_error(&e.to_string());
                return push_or_gone(ctx, error, BridgeOutcome::StreamError).await;
            }
        }
    }
    BridgeOutcome::Closed
}

async fn push_or_gone(
    ctx: &BridgeContext,
    payload: String,
    outcome: BridgeOutcome,
) -> BridgeOutcome {
    if ctx.sender.send(payload).await.is_err() {
        BridgeOutcome::ReceiverGone
    } else {
        outcome
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_body(events: &[&str]) -> String {
        events.iter().map(|e| format!("data: {e}\n\n")).collect()
    }

    fn context(registry: &Registry, capacity: usize) -> (BridgeContext, mpsc::Receiver<String>) {
        let (sender, rx) = mpsc::channel(capacity);
        let ctx = BridgeContext {
            session_id: SessionId::from("s1"),
            backend: "calc".into(),
            registry: registry.clone(),
            client: reqwest::Client::new(),
            sender,
            stream_count: 3,
        };
        (ctx, rx)
    }

    async fn drain(mut rx: mpsc::Receiver<String>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Some(p) = rx.recv().await {
            out.push(serde_json::from_str(&p).unwrap());
        }
        out
    }

    async fn drain_raw(mut rx: mpsc::Receiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(p) = rx.recv().await {
            out.push(p);
        }
        out
    }

    async fn registered(server: &MockServer) -> Registry {
        let registry = Registry::default();
        let _ = registry.register("calc", &server.uri(), Map::new()).unwrap();
        registry
    }

    #[tokio::test]
    async fn progress_then_done_yields_payloads_and_sentinel() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            r#"{"event":"progress","step":1,"total":3}"#,
            r#"{"event":"progress","step":2,"total":3}"#,
            r#"{"event":"progress","step":3,"total":3}"#,
            r#"{"event":"done"}"#,
        ]);
        Mock::given(method("GET"))
            .and(path("/stream"))
            .and(query_param("n", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let registry = registered(&server).await;
        let (ctx, rx) = context(&registry, 16);
        run_bridge(ctx, CancellationToken::new()).await;

        let out = drain(rx).await;
        assert_eq!(out.len(), 4);
        for (i, p) in out[..3].iter().enumerate() {
            assert_eq!(p["event"], "progress");
            assert_eq!(p["step"], i + 1);
        }
        assert_eq!(out[3], serde_json::json!({"event": "closed"}));
    }

    #[tokio::test]
    async fn close_without_done_still_sends_sentinel() {
        let server = MockServer::start().await;
        Mock::given(path("/stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&[r#"{"event":"progress","step":1}"#]), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let registry = registered(&server).await;
        let (ctx, rx) = context(&registry, 16);
        run_bridge(ctx, CancellationToken::new()).await;

        let out = drain(rx).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[1]["event"], "closed");
    }

    #[tokio::test]
    async fn error_status_pushes_error_then_sentinel() {
        let server = MockServer::start().await;
        Mock::given(path("/stream"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let registry = registered(&server).await;
        let (ctx, rx) = context(&registry, 16);
        run_bridge(ctx, CancellationToken::new()).await;

        let out = drain(rx).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["error"], "backend stream failed");
        assert_eq!(out[0]["status"], 503);
        assert_eq!(out[1]["event"], "closed");
    }

    #[tokio::test]
    async fn unreachable_backend_pushes_request_error() {
        let server = MockServer::start().await;
        let registry = registered(&server).await;
        drop(server);
        let (ctx, rx) = context(&registry, 16);
        run_bridge(ctx, CancellationToken::new()).await;

        let out = drain(rx).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["error"], "request error");
        assert_eq!(out[1]["event"], "closed");
    }

    #[tokio::test]
    async fn missing_backend_pushes_not_found() {
        let registry = Registry::default();
        let (ctx, rx) = context(&registry, 16);
        run_bridge(ctx, CancellationToken::new()).await;

        let out = drain(rx).await;
        assert_eq!(out[0]["error"], "backend not found");
        assert_eq!(out[0]["detail"], "calc");
        assert_eq!(out[1]["event"], "closed");
    }

    #[tokio::test]
    async fn non_json_payloads_forwarded() {
        let server = MockServer::start().await;
        Mock::given(path("/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                sse_body(&["hello", r#"{"event":"progress","step":1}"#, r#"{"event":"done"}"#]),
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        let registry = registered(&server).await;
        let (ctx, rx) = context(&registry, 16);
        run_bridge(ctx, CancellationToken::new()).await;

        let out = drain_raw(rx).await;
        assert_eq!(
            out,
            vec![
                "hello".to_string(),
                r#"{"event":"progress","step":1}"#.to_string(),
                payload::sentinel(),
            ]
        );
    }

    #[tokio::test]
    async fn read_error_mid_stream_pushes_request_error_then_sentinel() {
        let registry = Registry::default();
        let (ctx, rx) = context(&registry, 16);
        let body = futures::stream::iter(vec![
            Ok(Bytes::from("data: {\"event\":\"progress\",\"step\":1}\n\n")),
            Err("connection reset"),
        ]);

        let outcome = pump_body(&ctx, body).await;
        assert_eq!(outcome, BridgeOutcome::StreamError);
        assert!(outcome.is_error());
        assert_eq!(seal(&ctx, outcome).await, BridgeOutcome::StreamError);
        drop(ctx);

        let out = drain(rx).await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[0]["step"], 1);
        assert_eq!(out[1]["error"], "request error");
        assert_eq!(out[1]["detail"], "connection reset");
        assert_eq!(out[2]["event"], "closed");
    }

    #[tokio::test]
    async fn cancellation_pushes_nothing_more() {
        let server = MockServer::start().await;
        Mock::given(path("/stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&[r#"{"event":"progress","step":1}"#]), "text/event-stream")
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let registry = registered(&server).await;
        let (ctx, mut rx) = context(&registry, 16);
        let handle = spawn_bridge(ctx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;

        // every sender is gone and nothing was pushed
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn cancellation_unblocks_full_buffer() {
        let server = MockServer::start().await;
        Mock::given(path("/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                sse_body(&[r#"{"step":1}"#, r#"{"step":2}"#, r#"{"step":3}"#]),
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        let registry = registered(&server).await;
        let (ctx, mut rx) = context(&registry, 1);
        let handle = spawn_bridge(ctx);

        // first payload fills the buffer; the bridge then blocks on send
        let first = rx.recv().await.unwrap();
        assert!(first.contains("\"step\":1"));
        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("shutdown must not hang on a full buffer");
    }

    #[test]
    fn outcome_error_classification() {
        assert!(BridgeOutcome::StatusFailed.is_error());
        assert!(BridgeOutcome::StreamError.is_error());
        assert!(!BridgeOutcome::Cancelled.is_error());
        assert!(!BridgeOutcome::BackendDone.is_error());
        assert!(!BridgeOutcome::ReceiverGone.is_error());
    }
}
