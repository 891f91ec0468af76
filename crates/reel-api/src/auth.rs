//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the verified user
//! id in `x-user-id`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

const MAX_USER_ID_LEN: usize = 128;

/// Authenticated user extracted from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uid = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthorized(format!("Missing {} header", USER_ID_HEADER)))?;

        if uid.len() > MAX_USER_ID_LEN || uid.chars().any(|c| c.is_control() || c == '/') {
            return Err(ApiError::unauthorized("Malformed user id"));
        }

        Ok(Self { uid: uid.to_string() })
    }
}
