//! User and session API endpoints.
//!
//! - POST `/register` - Create a new account
//! - POST `/login` - Authenticate and open a session
//! - POST `/refresh-token` - Rotate the refresh token
//! - POST `/logout` - Close the session and clear cookies
//! - POST `/change-password` - Verify old password, store a new hash
//! - GET `/me` - Current user profile

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::error::{ApiError, ResultExt};
use crate::auth::{
    ACCESS_COOKIE_NAME, ApiAuth, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, set_cookie,
};
use crate::db::{Database, User};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::session::{SessionManager, TokenPair, hash_password};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub sessions: SessionManager,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
    pub no_signup: bool,
    pub request_timeout: Duration,
}

impl_has_auth_state!(UsersState);

impl UsersState {
    fn deadline(&self) -> Instant {
        Instant::now() + self.request_timeout
    }
}

pub fn router(state: UsersState) -> Router {
    let mut router = Router::new()
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/me", get(current_user));

    if !state.no_signup {
        router = router.route("/register", post(register));
    }

    router.with_state(state)
}

/// Public user profile: never exposes the password hash or the refresh
/// fingerprint.
#[derive(Serialize)]
struct UserProfile {
    uuid: String,
    username: String,
    email: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            uuid: user.uuid,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<UsersState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    let email = payload.email.trim();

    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }
    if username.len() > 32 {
        return Err(ApiError::bad_request(
            "Username cannot be longer than 32 characters",
        ));
    }
    // Only allow alphanumeric and underscores
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }
    if email.is_empty() || !email.contains('@') || email.len() > 254 {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    let uuid = uuid::Uuid::new_v4().to_string();
    let password_hash = hash_password(&payload.password)?;

    let created = state
        .db
        .users()
        .create(&uuid, username, email, &password_hash)
        .await;

    if let Err(e) = &created {
        // The unique constraints are the source of truth; a pre-check
        // would still race with a concurrent registration.
        if e.as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation())
        {
            return Err(ApiError::conflict("Username or email is already taken"));
        }
    }
    created.db_err("Failed to create user")?;

    let user = state
        .db
        .users()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load created user")?
        .ok_or_else(|| ApiError::internal("Created user not found"))?;

    Ok((StatusCode::CREATED, Json(UserProfile::from(user))))
}

#[derive(Deserialize)]
struct LoginRequest {
    /// Username or email
    identifier: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user: Option<UserProfile>,
    access_token: String,
    refresh_token: String,
}

/// Build the Set-Cookie headers for a freshly issued token pair.
fn token_cookies(pair: &TokenPair, secure: bool) -> AppendHeaders<[(axum::http::HeaderName, String); 2]> {
    AppendHeaders([
        (
            SET_COOKIE,
            set_cookie(
                ACCESS_COOKIE_NAME,
                &pair.access_token,
                pair.access_duration,
                secure,
            ),
        ),
        (
            SET_COOKIE,
            set_cookie(
                REFRESH_COOKIE_NAME,
                &pair.refresh_token,
                pair.refresh_duration,
                secure,
            ),
        ),
    ])
}

async fn login(
    State(state): State<UsersState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, pair) = state
        .sessions
        .login(&payload.identifier, &payload.password, state.deadline())
        .await?;

    // Tokens go out both ways: httpOnly cookies for browsers, body fields
    // for clients without a cookie jar.
    Ok((
        StatusCode::OK,
        token_cookies(&pair, state.secure_cookies),
        Json(SessionResponse {
            user: Some(UserProfile::from(user)),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

const MAX_REFRESH_BODY_BYTES: usize = 16 * 1024;

/// Rotate the refresh token. The cookie takes precedence; clients without
/// cookies send the token in the body.
async fn refresh_token(
    State(state): State<UsersState>,
    request: axum::extract::Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, body) = request.into_parts();

    let presented = match get_cookie(&parts.headers, REFRESH_COOKIE_NAME) {
        Some(token) => token.to_string(),
        None => {
            let bytes = axum::body::to_bytes(body, MAX_REFRESH_BODY_BYTES)
                .await
                .map_err(|_| ApiError::bad_request("Invalid request body"))?;
            serde_json::from_slice::<RefreshRequest>(&bytes)
                .map(|req| req.refresh_token)
                .map_err(|_| ApiError::unauthorized("Refresh token is required"))?
        }
    };

    let pair = state.sessions.refresh(&presented, state.deadline()).await?;

    Ok((
        StatusCode::OK,
        token_cookies(&pair, state.secure_cookies),
        Json(SessionResponse {
            user: None,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

/// Logout - clear the stored fingerprint and both cookies. Idempotent:
/// a second logout finds nothing to clear and still succeeds.
async fn logout(
    State(state): State<UsersState>,
    ApiAuth(auth): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    state
        .sessions
        .logout(&auth.claims.sub, state.deadline())
        .await?;

    let secure = state.secure_cookies;
    Ok((
        StatusCode::OK,
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, secure)),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, secure)),
        ]),
        Json(serde_json::json!({ "success": true })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<UsersState>,
    ApiAuth(auth): ApiAuth,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    state
        .sessions
        .change_password(
            &auth.claims.sub,
            &payload.old_password,
            &payload.new_password,
            state.deadline(),
        )
        .await?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "success": true }))))
}

async fn current_user(
    State(state): State<UsersState>,
    ApiAuth(auth): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_uuid(&auth.claims.sub)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    Ok((StatusCode::OK, Json(UserProfile::from(user))))
}
