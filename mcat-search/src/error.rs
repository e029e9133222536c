//! Error types for mcat-search
//!
//! Request-level failures only. Provider-level failures never reach this
//! type; they travel as `provider_error` events on the search stream.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::aggregator::{RequestError, SearchRejection};
use crate::filter::PolicyError;
use crate::providers::RegistryError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable identity on the request (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is known but may not search (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownUser(_) | RegistryError::Banned(_) => {
                ApiError::Forbidden(err.to_string())
            }
            RegistryError::Unavailable(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::UnknownUser(_) => ApiError::Forbidden(err.to_string()),
            PolicyError::Unavailable(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<SearchRejection> for ApiError {
    fn from(err: SearchRejection) -> Self {
        match err {
            SearchRejection::Registry(e) => e.into(),
            SearchRejection::Policy(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
