//! Custom Axum extractors.
//!
//! Authentication happens upstream: the identity provider in front of this
//! service resolves the session and forwards the caller's profile ID in the
//! `X-User-Id` header. [`Actor`] reads it.

use crate::error::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use roomly_core::types::UserId;
use uuid::Uuid;

/// Header carrying the authenticated caller's profile ID.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated caller.
///
/// # Example
///
/// ```ignore
/// async fn handler(Actor(user_id): Actor) -> String {
///     format!("Hello {user_id}")
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized("Missing X-User-Id header"))?;

        let user_id = value
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| AppError::unauthorized("X-User-Id is not a valid user ID"))?;

        Ok(Self(UserId::from_uuid(user_id)))
    }
}
