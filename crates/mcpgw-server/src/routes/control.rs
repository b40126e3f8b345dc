//! Control plane: backend registration.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use mcpgw_gateway::BackendEntry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::AppState;
use crate::error::ApiResult;

/// `POST /control/register` body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Registry key.
    pub name: String,
    /// Backend base URL.
    pub base_url: String,
    /// Optional opaque metadata; `null` is treated as empty.
    #[serde(default)]
    pub meta: Option<Map<String, Value>>,
}

/// `POST /control/register` response.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Name that was registered.
    pub registered: String,
}

/// `POST /control/unregister` body.
#[derive(Debug, Deserialize)]
pub struct UnregisterRequest {
    /// Name to remove. A missing name is reported as an unknown backend.
    #[serde(default)]
    pub name: String,
}

/// `POST /control/unregister` response.
#[derive(Debug, Serialize)]
pub struct UnregisterResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Name that was removed.
    pub unregistered: String,
}

/// `GET /control/list` response.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// Every registered backend keyed by name.
    pub servers: BTreeMap<String, BackendEntry>,
}

pub(super) async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterResponse>> {
    let Json(req) = payload?;
    let entry = state.manager.registry().register(
        &req.name,
        &req.base_url,
        req.meta.unwrap_or_default(),
    )?;
    Ok(Json(RegisterResponse {
        status: "ok",
        registered: entry.name,
    }))
}

pub(super) async fn unregister(
    State(state): State<AppState>,
    payload: Result<Json<UnregisterRequest>, JsonRejection>,
) -> ApiResult<Json<UnregisterResponse>> {
    let Json(req) = payload?;
    let entry = state.manager.registry().unregister(&req.name)?;
    Ok(Json(UnregisterResponse {
        status: "ok",
        unregistered: entry.name,
    }))
}

pub(super) async fn list(State(state): State<AppState>) -> Json<ListResponse> {
    Json(ListResponse {
        servers: state.manager.registry().list(),
    })
}
