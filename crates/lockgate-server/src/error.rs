//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the unified error type for the server. It implements
//! `axum::response::IntoResponse` to produce structured JSON error responses
//! with appropriate HTTP status codes. Gate errors are converted through their
//! [`ErrorKind`] tag.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lockgate_core::{ErrorKind, GateError};

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "RESOURCE_LOCKED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API errors with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing resource key or invalid request (400).
    #[error("{0}")]
    Configuration(String),

    /// Request body the handler refuses (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Lease could not be acquired (423).
    #[error("{0}")]
    Locked(String),

    /// Lease wait abandoned because the server is shutting down (503).
    #[error("{0}")]
    Cancelled(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Configuration(_) | ApiError::BadRequest(_) => ErrorKind::Configuration,
            ApiError::Locked(_) => ErrorKind::ResourceLocked,
            ApiError::Cancelled(_) => ErrorKind::Cancelled,
            ApiError::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            other => other.kind().code(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Configuration => StatusCode::BAD_REQUEST,
            ErrorKind::ResourceLocked => StatusCode::LOCKED,
            ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = ApiErrorDetail {
            code: self.code().to_string(),
            message: self.to_string(),
        };

        let body = serde_json::json!({
            "success": false,
            "error": detail,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Configuration => ApiError::Configuration(message),
            ErrorKind::ResourceLocked => ApiError::Locked(message),
            ErrorKind::Cancelled => ApiError::Cancelled(message),
            ErrorKind::Internal => ApiError::InternalError(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use lockgate_core::ConfigError;

    use super::*;

    #[test]
    fn contention_maps_to_423_with_resource_in_message() {
        let api = ApiError::from(GateError::Contention {
            resource_key: "order-42".into(),
            attempts: 3,
        });
        assert_eq!(api.status(), StatusCode::LOCKED);
        assert_eq!(api.to_string(), "failed acquiring lock for resource order-42");
    }

    #[test]
    fn missing_key_maps_to_400() {
        let api = ApiError::from(GateError::Configuration(ConfigError::EmptyResourceKey));
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.kind().code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn cancelled_maps_to_503() {
        let api = ApiError::from(GateError::Cancelled {
            resource_key: "k".into(),
        });
        assert_eq!(api.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.code(), "CANCELLED");
    }

    #[test]
    fn bad_request_has_its_own_code() {
        let api = ApiError::BadRequest("hold_ms too large".into());
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.code(), "BAD_REQUEST");
    }
}
