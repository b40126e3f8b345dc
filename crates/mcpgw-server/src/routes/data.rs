//! Data plane: sessions, event streams, forwarded requests.

use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use mcpgw_core::SessionId;
use mcpgw_gateway::SessionInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AppState;
use crate::error::ApiResult;

/// `POST /data/connect` body.
#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    /// Backend name. A missing name is reported as an unknown backend.
    #[serde(default)]
    pub server: String,
}

/// `POST /data/connect` response.
#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    /// New session ID.
    pub session_id: SessionId,
    /// Backend the session is bound to.
    pub server: String,
}

/// `POST /data/close/{id}` response.
#[derive(Debug, Serialize)]
pub struct CloseResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Whether this call removed the session.
    pub closed: bool,
}

/// `GET /data/sessions` response.
#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    /// Live sessions, oldest first.
    pub sessions: Vec<SessionInfo>,
}

pub(super) async fn connect(
    State(state): State<AppState>,
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> ApiResult<Json<ConnectResponse>> {
    let Json(req) = payload?;
    let session_id = state.manager.connect(&req.server)?;
    Ok(Json(ConnectResponse {
        session_id,
        server: req.server,
    }))
}

/// Frames are written pre-encoded so keep-alives go out as a bare `:\n\n`.
pub(super) async fn stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let frames = state.manager.open_stream(&SessionId::from_string(id))?;
    let body = Body::from_stream(frames.map(|frame| Ok::<_, Infallible>(frame.encode())));
    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response())
}

pub(super) async fn request(
    State(state): State<AppState>,
    Path((id, method)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let result = state
        .manager
        .forward(&SessionId::from_string(id), &method, body)
        .await?;
    Ok(Json(result))
}

pub(super) async fn close(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<CloseResponse> {
    let closed = state.manager.teardown(&SessionId::from_string(id)).await;
    Json(CloseResponse {
        status: "ok",
        closed,
    })
}

pub(super) async fn sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        sessions: state.manager.sessions(),
    })
}
