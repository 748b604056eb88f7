//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthState;
use super::types::AuthenticatedUser;
use crate::jwt::JwtError;

/// Extract a bearer token from the Authorization header.
fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Core authentication logic: cookie takes precedence over the
/// Authorization header. Pure verification, no store access.
fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthState,
{
    let token = get_cookie(&parts.headers, ACCESS_COOKIE_NAME)
        .or_else(|| bearer_token(&parts.headers))
        .ok_or(AuthErrorKind::NotAuthenticated)?;

    let claims = state.jwt().validate_access_token(token).map_err(|e| match e {
        JwtError::Expired => AuthErrorKind::TokenExpired,
        _ => AuthErrorKind::InvalidToken,
    })?;

    Ok(AuthenticatedUser { claims })
}

/// Extractor for API endpoints that require authentication.
/// Validates the access token (short-lived, stateless) and attaches the
/// verified identity to the handler. Returns JSON 401 errors.
pub struct ApiAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for ApiAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .map(ApiAuth)
            .map_err(ApiAuthError::new)
    }
}
