//! Error types for gallery-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Filter session id unknown or expired (404)
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// Category slug sent to a session that does not know it (400)
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// Catalog writes are not supported by the configured backend (405)
    #[error("Catalog is read-only: {0}")]
    ReadOnly(String),

    /// gallery-common error
    #[error(transparent)]
    Common(#[from] gallery_common::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use gallery_common::Error as E;

        match self {
            ApiError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            ApiError::UnknownCategory(_) => (StatusCode::BAD_REQUEST, "INVALID_CATEGORY"),
            ApiError::ReadOnly(_) => (StatusCode::METHOD_NOT_ALLOWED, "READ_ONLY"),
            ApiError::Common(err) => match err {
                E::UpstreamUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE")
                }
                E::InvalidItem(_) => (StatusCode::NOT_FOUND, "INVALID_ITEM"),
                E::InvalidCategory(_) => (StatusCode::NOT_FOUND, "INVALID_CATEGORY"),
                E::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                E::Config(_) | E::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();
        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", self);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
