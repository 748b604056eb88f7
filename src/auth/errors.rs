//! Authentication error types.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

use super::cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_cookie};

/// Internal auth error kind used by the gate.
#[derive(Debug)]
pub(super) enum AuthErrorKind {
    NotAuthenticated,
    TokenExpired,
    InvalidToken,
}

/// API authentication error (returns JSON and clears token cookies).
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) kind: AuthErrorKind,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Not authenticated",
            AuthErrorKind::TokenExpired => "Access token expired",
            AuthErrorKind::InvalidToken => "Invalid token",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        use axum::Json;
        use axum::http::{HeaderValue, StatusCode};
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response();

        // Clear both token cookies so a client stuck with bad tokens
        // falls back to a clean login.
        let headers = response.headers_mut();
        for name in [ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME] {
            if let Ok(value) = HeaderValue::from_str(&clear_cookie(name, false)) {
                headers.append(header::SET_COOKIE, value);
            }
        }

        response
    }
}
