pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod session;

use api::{AuthState, create_api_router};
use axum::Router;
use db::Database;
use jwt::TokenKeys;
use password::CredentialVerifier;
use rate_limit::{RateLimitConfig, RateLimitSettings, spawn_prune_scheduler};
use session::Sessions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing refresh tokens, distinct from the access secret
    pub refresh_secret: Vec<u8>,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Password hashing and verification
    pub credentials: Arc<dyn CredentialVerifier>,
    /// Per-IP limits on login and registration, None disables them
    pub rate_limit: Option<RateLimitSettings>,
    /// IP extraction strategy (requires running behind a proxy)
    pub ip_extractor: Option<cli::IpExtractor>,
}

/// Build the per-IP limiters, if rate limiting is enabled.
fn rate_limiters(config: &ServerConfig) -> Option<Arc<RateLimitConfig>> {
    config
        .rate_limit
        .as_ref()
        .map(|settings| Arc::new(RateLimitConfig::new(settings, config.ip_extractor.clone())))
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    build_router(config, rate_limiters(config))
}

fn build_router(config: &ServerConfig, rate_limit: Option<Arc<RateLimitConfig>>) -> Router {
    let keys = Arc::new(TokenKeys::new(
        &config.access_secret,
        &config.refresh_secret,
        config.access_ttl,
        config.refresh_ttl,
    ));

    let state = AuthState {
        db: config.db.clone(),
        sessions: Sessions::new(config.db.clone(), keys),
        credentials: config.credentials.clone(),
        secure_cookies: config.secure_cookies,
    };

    Router::new().nest("/api", create_api_router(state, rate_limit))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let rate_limit = rate_limiters(&config);
    if let Some(limiters) = &rate_limit {
        spawn_prune_scheduler(limiters.clone());
    }

    let app = build_router(&config, rate_limit);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
