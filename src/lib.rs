pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod ledger;
pub mod session;

use api::create_api_router;
use axum::Router;
use db::Database;
use jwt::JwtConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Whether new user signups are disabled
    pub no_signup: bool,
    /// Per-request deadline for store access
    pub request_timeout: Duration,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    // The signing key is loaded once here and never mutated
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret));

    let api_router = create_api_router(
        config.db.clone(),
        jwt,
        config.secure_cookies,
        config.no_signup,
        config.request_timeout,
    );

    Router::new().nest("/api", api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
