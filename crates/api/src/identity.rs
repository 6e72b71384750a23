//! Shopper identity extraction from request headers.
//!
//! Authentication itself happens upstream; an authenticated request arrives
//! with a trusted `x-user-id` header, an anonymous one with the
//! client-generated `x-session-id`. A request carrying neither cannot own a
//! cart and is rejected at the boundary.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{CartIdentity, SessionToken, UserId};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "x-user-id";

/// Header carrying the anonymous session token.
pub const SESSION_HEADER: &str = "x-session-id";

/// The shopper behind a request: authenticated user or anonymous session.
#[derive(Debug, Clone)]
pub struct ShopperIdentity(pub CartIdentity);

impl<S: Send + Sync> FromRequestParts<S> for ShopperIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = user_from_headers(parts)? {
            return Ok(Self(CartIdentity::User(user)));
        }

        let Some(value) = parts.headers.get(SESSION_HEADER) else {
            return Err(ApiError::BadRequest(
                "Session id required for anonymous shoppers".to_string(),
            ));
        };
        let token = value
            .to_str()
            .map_err(|_| ApiError::BadRequest("Malformed session id".to_string()))?;
        if token.is_empty() {
            return Err(ApiError::BadRequest("Malformed session id".to_string()));
        }
        Ok(Self(CartIdentity::Session(SessionToken::from(token))))
    }
}

/// An authenticated shopper; rejects anonymous requests.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match user_from_headers(parts)? {
            Some(user) => Ok(Self(user)),
            None => Err(ApiError::Unauthorized(
                "Authentication required".to_string(),
            )),
        }
    }
}

fn user_from_headers(parts: &Parts) -> Result<Option<UserId>, ApiError> {
    let Some(value) = parts.headers.get(USER_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::BadRequest("Malformed user id".to_string()))?;
    let uuid = Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user id: {e}")))?;
    Ok(Some(UserId::from_uuid(uuid)))
}
