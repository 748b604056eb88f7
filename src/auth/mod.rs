//! Request gate: bearer/cookie token extraction and access-token verification.
//!
//! The gate only verifies access tokens; it never touches the store and
//! never refreshes. Rotation happens explicitly through the refresh
//! endpoint, so an expired access token here is a plain 401 and the
//! client decides whether to refresh or re-login.

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, set_cookie,
};
pub use errors::ApiAuthError;
pub use extractors::ApiAuth;
pub use state::HasAuthState;
pub use types::AuthenticatedUser;
