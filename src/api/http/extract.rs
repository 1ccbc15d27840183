// src/api/http/extract.rs
// Route policy as extractors
//
// Handlers declare their policy by the extractor they take: CurrentUser for
// "any authenticated user", AdminUser for "admin only", MaybeUser where
// anonymous is acceptable (logout, the session middleware's own plumbing).
// Denials are distinguishable: no identity is 401, wrong role is 403.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::AuthError;
use crate::users::User;
use super::error::ApiError;
use super::middleware::AuthSession;

/// Any authenticated user. Rejects anonymous requests with 401.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession>()
            .map(|s| CurrentUser(s.user.clone()))
            .ok_or(ApiError(AuthError::Unauthenticated))
    }
}

/// The resolved session, if any. Never rejects.
pub struct MaybeUser(pub Option<AuthSession>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<AuthSession>().cloned()))
    }
}

/// Admin only. Anonymous requests get 401; authenticated non-admins get
/// 403, which callers can tell apart from a missing login.
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<AuthSession>()
            .ok_or(ApiError(AuthError::Unauthenticated))?;
        if !session.user.is_admin() {
            return Err(ApiError(AuthError::Forbidden));
        }
        Ok(AdminUser(session.user.clone()))
    }
}
