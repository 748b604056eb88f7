mod error;
mod relations;
mod users;

use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::ledger::RelationLedger;
use crate::session::SessionManager;

pub use users::UsersState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    secure_cookies: bool,
    no_signup: bool,
    request_timeout: Duration,
) -> Router {
    let sessions = SessionManager::new(db.clone(), jwt.clone());
    let ledger = RelationLedger::new(db.clone());

    let users_state = users::UsersState {
        db: db.clone(),
        sessions,
        jwt: jwt.clone(),
        secure_cookies,
        no_signup,
        request_timeout,
    };

    let relations_state = relations::RelationsState {
        db,
        ledger,
        jwt,
        request_timeout,
    };

    Router::new()
        .nest("/users", users::router(users_state))
        .nest("/likes", relations::likes_router(relations_state.clone()))
        .nest(
            "/subscriptions",
            relations::subscriptions_router(relations_state),
        )
}
