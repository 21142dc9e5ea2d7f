//! REST error envelope
//!
//! Every REST failure becomes `{"error": CODE, "message": ...}` with a
//! status from the platform error taxonomy. Internal faults are logged
//! with full context and leave the process with a generic message so
//! nothing about the fault leaks to callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crosstalk_grant::GrantError;
use crosstalk_store::StoreError;
use serde::Serialize;
use tracing::error;

/// REST-plane error kinds
#[derive(Debug)]
pub enum ApiError {
    /// Malformed body, unknown enum value, bad ttl
    Validation(String),
    /// Missing or invalid application credentials
    Unauthorized(String),
    /// Authenticated, but the resource belongs to another tenant
    Forbidden(String),
    /// Referenced resource does not exist
    NotFound(String),
    /// Per-IP allowance exceeded
    RateLimited,
    /// Unexpected fault; details are in the logs only
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    /// Log an unexpected fault and return the opaque variant
    pub fn internal(err: impl std::fmt::Display) -> Self {
        error!(error = %err, "internal API fault");
        ApiError::Internal
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "TENANT_MISMATCH",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::RateLimited => "RATE_LIMITED",
            ApiError::Internal => "INTERNAL_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Validation(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            ApiError::RateLimited => "rate limit exceeded".to_string(),
            ApiError::Internal => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code(),
            message: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("not found".to_string()),
            StoreError::Unauthorized => {
                ApiError::Unauthorized("invalid application credentials".to_string())
            }
            other => ApiError::internal(other),
        }
    }
}

impl From<GrantError> for ApiError {
    fn from(err: GrantError) -> Self {
        ApiError::Validation(err.to_string())
    }
}
