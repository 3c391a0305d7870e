//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::ValidationError;
use engine::{EngineError, ErrorKind};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// No usable `x-user-id` header.
    Unauthorized(String),
    /// Error returned by the reservation engine.
    Engine(EngineError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg, "kind": ErrorKind::Validation }),
            ),
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": msg, "kind": "unauthorized" }),
            ),
            ApiError::Engine(err) => engine_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": msg, "kind": "internal" }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict | ErrorKind::IllegalTransition => StatusCode::CONFLICT,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Storage => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn engine_error_to_response(err: EngineError) -> (StatusCode, serde_json::Value) {
    let kind = err.kind();
    let status = status_for(kind);
    if kind == ErrorKind::Storage {
        tracing::error!(error = %err, "storage failure");
    }

    let mut body = serde_json::json!({ "error": err.to_string(), "kind": kind });
    match &err {
        EngineError::TimeConflict { conflicts } => {
            body["conflicts"] = serde_json::to_value(conflicts).unwrap_or_default();
        }
        EngineError::StockShortfall { shortfalls } => {
            body["shortfalls"] = serde_json::to_value(shortfalls).unwrap_or_default();
        }
        EngineError::SpaceUnavailable { status, .. } => {
            body["space_status"] = serde_json::json!(status);
        }
        _ => {}
    }
    (status, body)
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Engine(err.into())
    }
}
