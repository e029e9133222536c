//! Identity extraction
//!
//! The authentication layer in front of this service resolves the caller
//! and forwards the username in the `x-mcat-user` header. Requests without
//! it are rejected with 401 before any provider is contacted.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;
use crate::identity::UserIdentity;

/// Header carrying the resolved username
pub const USER_HEADER: &str = "x-mcat-user";

/// Extractor for the requesting user
#[derive(Debug, Clone)]
pub struct RequestIdentity(pub UserIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", USER_HEADER)))?;

        let username = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized(format!("Malformed {} header", USER_HEADER)))?;

        UserIdentity::new(username)
            .map(RequestIdentity)
            .ok_or_else(|| ApiError::Unauthorized(format!("Empty {} header", USER_HEADER)))
    }
}
