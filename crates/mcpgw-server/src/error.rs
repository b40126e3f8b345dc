//! HTTP rendering of [`GatewayError`].
//!
//! Errors render as `{"code": ..., "detail": ...}` with the error's status.
//! Upstream failures are the exception: the backend's status and body are
//! relayed as-is so clients see exactly what the backend said.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use mcpgw_core::GatewayError;
use serde::Serialize;
use tracing::warn;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `SESSION_NOT_FOUND`.
    pub code: &'static str,
    /// Human-readable message.
    pub detail: String,
}

/// Handler error wrapper.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(GatewayError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);

        if let GatewayError::Upstream { body, .. } = self.0 {
            let content_type = if serde_json::from_str::<serde_json::Value>(&body).is_ok() {
                "application/json"
            } else {
                "text/plain; charset=utf-8"
            };
            return (status, [(header::CONTENT_TYPE, content_type)], body).into_response();
        }

        if status.is_server_error() {
            warn!(code = self.0.error_code(), error = %self.0, "request failed");
        }
        let body = ErrorBody {
            code: self.0.error_code(),
            detail: self.0.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}

/// Handler result alias.
pub type ApiResult<T> = Result<T, ApiError>;
