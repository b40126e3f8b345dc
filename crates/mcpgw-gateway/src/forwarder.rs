//! Request forwarder: stateless request/response relay.
//!
//! Each call maps a session to its backend and re-resolves the backend's
//! address from the registry, so unregistering a backend takes effect on
//! the very next forward while the session itself lives on.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use mcpgw_core::{GatewayError, Result, SessionId};
use metrics::counter;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::registry::Registry;
use crate::session::SessionStore;
use crate::telemetry::{FORWARD_ERRORS_TOTAL, FORWARD_REQUESTS_TOTAL};
use crate::upstream::Upstream;

/// Methods a backend exposes under `/math/{method}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MathMethod {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`
    Divide,
}

impl MathMethod {
    /// Every supported method.
    pub const ALL: [Self; 4] = [Self::Add, Self::Subtract, Self::Multiply, Self::Divide];

    /// Path segment.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }
}

impl fmt::Display for MathMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MathMethod {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| GatewayError::InvalidMethod(s.to_string()))
    }
}

/// Relays one request per call to a session's backend.
#[derive(Clone)]
pub struct Forwarder {
    registry: Registry,
    sessions: Arc<dyn SessionStore>,
    upstream: Arc<Upstream>,
    timeout: Duration,
}

impl fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forwarder")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Forwarder {
    /// Create a forwarder with a per-call timeout.
    pub fn new(
        registry: Registry,
        sessions: Arc<dyn SessionStore>,
        upstream: Arc<Upstream>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            sessions,
            upstream,
            timeout,
        }
    }

    /// Forward `body` to `POST {base}/math/{method}` for the session's backend.
    ///
    /// Errors:
    /// - [`GatewayError::SessionNotFound`] for an unknown session
    /// - [`GatewayError::BackendNotFound`] if the backend was unregistered
    /// - [`GatewayError::InvalidMethod`] before any upstream call
    /// - [`GatewayError::Upstream`] with the backend's status and body
    /// - [`GatewayError::UpstreamUnavailable`] on network failure, timeout,
    ///   or a non-JSON success body
    #[instrument(skip_all, fields(session_id = %session_id, method = %method))]
    pub async fn forward(
        &self,
        session_id: &SessionId,
        method: &str,
        body: Value,
    ) -> Result<Value> {
        let result = self.forward_inner(session_id, method, body).await;
        if let Err(e) = &result {
            counter!(
                FORWARD_ERRORS_TOTAL,
                "method" => method.to_string(),
                "code" => e.error_code()
            )
            .increment(1);
        }
        result
    }

    async fn forward_inner(
        &self,
        session_id: &SessionId,
        method: &str,
        body: Value,
    ) -> Result<Value> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))?;
        let base_url = self.registry.resolve(session.backend())?;
        let method: MathMethod = method.parse()?;
        let client = self.upstream.client()?;

        counter!(FORWARD_REQUESTS_TOTAL, "method" => method.as_str()).increment(1);
        let url = format!("{base_url}/math/{method}");
        debug!(%url, "forwarding request");

        let response = client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(backend = %session.backend(), error = %e, "backend unreachable");
                GatewayError::UpstreamUnavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "backend returned error status");
            return Err(GatewayError::from_upstream(status.as_u16(), text));
        }

        response.json::<Value>().await.map_err(|e| {
            warn!(backend = %session.backend(), error = %e, "backend returned unreadable body");
            GatewayError::UpstreamUnavailable(format!("invalid response body: {e}"))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BridgeHandle;
    use crate::session::{InMemorySessionStore, Session};
    use assert_matches::assert_matches;
    use serde_json::{Map, json};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        forwarder: Forwarder,
        registry: Registry,
        session_id: SessionId,
        _buffer: mpsc::Sender<String>,
    }

    fn fixture(base_url: &str, timeout: Duration) -> Fixture {
        let registry = Registry::default();
        let _ = registry.register("calc", base_url, Map::new()).unwrap();
        let sessions = Arc::new(InMemorySessionStore::new());
        let (tx, rx) = mpsc::channel(1);
        let session_id = SessionId::from("s1");
        let handle = BridgeHandle::new(CancellationToken::new(), tokio::spawn(async {}));
        sessions.insert(Arc::new(Session::new(session_id.clone(), "calc", rx, handle)));
        let upstream = Arc::new(Upstream::from_client(reqwest::Client::new()));
        Fixture {
            forwarder: Forwarder::new(registry.clone(), sessions, upstream, timeout),
            registry,
            session_id,
            _buffer: tx,
        }
    }

    #[test]
    fn parse_methods() {
        assert_eq!("add".parse::<MathMethod>().unwrap(), MathMethod::Add);
        assert_eq!("divide".parse::<MathMethod>().unwrap(), MathMethod::Divide);
        assert_matches!("pow".parse::<MathMethod>(), Err(GatewayError::InvalidMethod(m)) if m == "pow");
        assert_matches!("ADD".parse::<MathMethod>(), Err(GatewayError::InvalidMethod(_)));
    }

    #[tokio::test]
    async fn forwards_and_returns_backend_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/math/add"))
            .and(body_json(json!({"a": 2, "b": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 5.0})))
            .expect(1)
            .mount(&server)
            .await;

        let fx = fixture(&server.uri(), Duration::from_secs(5));
        let out = fx
            .forwarder
            .forward(&fx.session_id, "add", json!({"a": 2, "b": 3}))
            .await
            .unwrap();
        assert_eq!(out, json!({"result": 5.0}));
    }

    #[tokio::test]
    async fn backend_error_status_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/math/divide"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "division by zero"})),
            )
            .mount(&server)
            .await;

        let fx = fixture(&server.uri(), Duration::from_secs(5));
        let err = fx
            .forwarder
            .forward(&fx.session_id, "divide", json!({"a": 1, "b": 0}))
            .await
            .unwrap_err();
        assert_matches!(err, GatewayError::Upstream { status: 400, ref body } if body.contains("division by zero"));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let server = MockServer::start().await;
        let fx = fixture(&server.uri(), Duration::from_secs(5));
        assert_matches!(
            fx.forwarder
                .forward(&SessionId::from("nope"), "add", json!({}))
                .await,
            Err(GatewayError::SessionNotFound(_))
        );
    }

    #[tokio::test]
    async fn invalid_method_makes_no_upstream_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let fx = fixture(&server.uri(), Duration::from_secs(5));
        assert_matches!(
            fx.forwarder.forward(&fx.session_id, "pow", json!({})).await,
            Err(GatewayError::InvalidMethod(_))
        );
    }

    #[tokio::test]
    async fn unregistered_backend_is_not_found_while_session_lives() {
        let server = MockServer::start().await;
        let fx = fixture(&server.uri(), Duration::from_secs(5));
        let _ = fx.registry.unregister("calc").unwrap();
        assert_matches!(
            fx.forwarder.forward(&fx.session_id, "add", json!({})).await,
            Err(GatewayError::BackendNotFound(name)) if name == "calc"
        );
    }

    #[tokio::test]
    async fn missing_backend_wins_over_invalid_method() {
        let server = MockServer::start().await;
        let fx = fixture(&server.uri(), Duration::from_secs(5));
        let _ = fx.registry.unregister("calc").unwrap();
        assert_matches!(
            fx.forwarder.forward(&fx.session_id, "pow", json!({})).await,
            Err(GatewayError::BackendNotFound(name)) if name == "calc"
        );
    }

    #[tokio::test]
    async fn re_registration_is_picked_up() {
        let old = MockServer::start().await;
        let new = MockServer::start().await;
        Mock::given(path("/math/add"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1.0})))
            .expect(1)
            .mount(&new)
            .await;

        let fx = fixture(&old.uri(), Duration::from_secs(5));
        let _ = fx.registry.unregister("calc").unwrap();
        let _ = fx.registry.register("calc", &new.uri(), Map::new()).unwrap();
        let out = fx.forwarder.forward(&fx.session_id, "add", json!({})).await.unwrap();
        assert_eq!(out["result"], 1.0);
    }

    #[tokio::test]
    async fn timeout_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(path("/math/add"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let fx = fixture(&server.uri(), Duration::from_millis(100));
        let err = fx
            .forwarder
            .forward(&fx.session_id, "add", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn unreachable_backend_is_502() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let fx = fixture(&uri, Duration::from_secs(2));
        assert_matches!(
            fx.forwarder.forward(&fx.session_id, "add", json!({})).await,
            Err(GatewayError::UpstreamUnavailable(_))
        );
    }

    #[tokio::test]
    async fn non_json_success_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(path("/math/add"))
            .respond_with(ResponseTemplate::new(200).set_body_string("five"))
            .mount(&server)
            .await;

        let fx = fixture(&server.uri(), Duration::from_secs(5));
        assert_matches!(
            fx.forwarder.forward(&fx.session_id, "add", json!({})).await,
            Err(GatewayError::UpstreamUnavailable(_))
        );
    }
}
