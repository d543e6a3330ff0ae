mod auth;
mod error;
mod health;
mod token;
mod validation;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::password::CredentialVerifier;
use crate::rate_limit::RateLimitConfig;
use crate::session::Sessions;

pub use auth::PublicUser;
pub use error::{ApiError, ApiJson, MessageResponse, ResultExt};
pub use validation::{
    LoginForm, LoginRequest, RegisterRequest, RegistrationForm, ValidationError, validate_login,
    validate_registration,
};

/// State shared by the account and token handlers.
#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub sessions: Sessions,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub secure_cookies: bool,
}

impl_has_auth_backend!(AuthState);

/// Create the API router.
pub fn create_api_router(state: AuthState, rate_limit: Option<Arc<RateLimitConfig>>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest(
            "/v1/auth",
            auth::router(state.clone(), rate_limit).nest("/token", token::router(state)),
        )
}
