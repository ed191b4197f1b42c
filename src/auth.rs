use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header the upstream auth proxy sets after verifying credentials.
pub const IDENTITY_HEADER: &str = "x-user-id";

/// Verified identity of the caller, captured once per request or per
/// WebSocket handshake and passed explicitly from there on.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AppError::Authentication)?;

        Ok(Self(user.to_string()))
    }
}
