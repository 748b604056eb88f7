//! Like and subscription API endpoints.
//!
//! - POST `/likes/videos/{id}` - Toggle a video like
//! - POST `/likes/comments/{id}` - Toggle a comment like
//! - POST `/likes/tweets/{id}` - Toggle a tweet like
//! - GET `/likes/videos` - Liked video ids
//! - POST `/subscriptions/{id}` - Toggle a channel subscription
//! - GET `/subscriptions` - Subscribed channel ids
//!
//! The actor is always the verified session's user; target ids are opaque
//! and never dereferenced here. Toggles are safe to retry blindly: the
//! response reports the state the call left behind.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use tokio::time::Instant;

use super::error::{ApiError, ResultExt, validate_target_id};
use crate::auth::ApiAuth;
use crate::db::{Database, RelationKind};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::ledger::RelationLedger;

#[derive(Clone)]
pub struct RelationsState {
    pub db: Database,
    pub ledger: RelationLedger,
    pub jwt: Arc<JwtConfig>,
    pub request_timeout: Duration,
}

impl_has_auth_state!(RelationsState);

impl RelationsState {
    fn deadline(&self) -> Instant {
        Instant::now() + self.request_timeout
    }

    /// Resolve the session's user uuid to a ledger actor id.
    async fn actor_id(&self, user_uuid: &str) -> Result<i64, ApiError> {
        let user = self
            .db
            .users()
            .get_by_uuid(user_uuid)
            .await
            .db_err("Failed to get user")?
            .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;
        Ok(user.id)
    }
}

pub fn likes_router(state: RelationsState) -> Router {
    Router::new()
        .route("/videos", get(list_liked_videos))
        .route("/videos/{target}", post(toggle_video_like))
        .route("/comments/{target}", post(toggle_comment_like))
        .route("/tweets/{target}", post(toggle_tweet_like))
        .with_state(state)
}

pub fn subscriptions_router(state: RelationsState) -> Router {
    Router::new()
        .route("/", get(list_subscriptions))
        .route("/{target}", post(toggle_subscription))
        .with_state(state)
}

#[derive(Serialize)]
struct ToggleResponse {
    /// State after this call: true when the relation now exists
    present: bool,
}

#[derive(Serialize)]
struct TargetsResponse {
    targets: Vec<String>,
}

async fn toggle(
    state: &RelationsState,
    auth: &crate::auth::AuthenticatedUser,
    kind: RelationKind,
    target: &str,
) -> Result<Json<ToggleResponse>, ApiError> {
    validate_target_id(target)?;
    let actor = state.actor_id(&auth.claims.sub).await?;

    let present = state
        .ledger
        .toggle(actor, kind, target, state.deadline())
        .await?;

    Ok(Json(ToggleResponse { present }))
}

async fn toggle_video_like(
    State(state): State<RelationsState>,
    ApiAuth(auth): ApiAuth,
    Path(target): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(&state, &auth, RelationKind::VideoLike, &target).await
}

async fn toggle_comment_like(
    State(state): State<RelationsState>,
    ApiAuth(auth): ApiAuth,
    Path(target): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(&state, &auth, RelationKind::CommentLike, &target).await
}

async fn toggle_tweet_like(
    State(state): State<RelationsState>,
    ApiAuth(auth): ApiAuth,
    Path(target): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(&state, &auth, RelationKind::TweetLike, &target).await
}

async fn toggle_subscription(
    State(state): State<RelationsState>,
    ApiAuth(auth): ApiAuth,
    Path(target): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(&state, &auth, RelationKind::Subscription, &target).await
}

async fn list_liked_videos(
    State(state): State<RelationsState>,
    ApiAuth(auth): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor_id(&auth.claims.sub).await?;
    let targets = state
        .ledger
        .list_by_actor(actor, RelationKind::VideoLike, state.deadline())
        .await?;
    Ok((StatusCode::OK, Json(TargetsResponse { targets })))
}

async fn list_subscriptions(
    State(state): State<RelationsState>,
    ApiAuth(auth): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor_id(&auth.claims.sub).await?;
    let targets = state
        .ledger
        .list_by_actor(actor, RelationKind::Subscription, state.deadline())
        .await?;
    Ok((StatusCode::OK, Json(TargetsResponse { targets })))
}
