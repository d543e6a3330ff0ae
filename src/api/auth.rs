//! Account endpoints.
//!
//! - POST `/login` - Verify credentials and start a session
//! - POST `/register` - Create an account and start a session
//! - GET `/me` - Public identity of the access token's subject

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::AuthState;
use super::error::{ApiError, ApiJson, ResultExt};
use super::validation::{LoginRequest, RegisterRequest, validate_login, validate_registration};
use crate::auth::{Auth, access_cookie, refresh_cookie};
use crate::db::{CreateUserError, NewUser, User, UserRole};
use crate::password::CredentialVerifier;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};
use crate::session::IssuedSession;

pub fn router(state: AuthState, rate_limit: Option<Arc<RateLimitConfig>>) -> Router {
    let mut login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone());
    let mut register_router = Router::new()
        .route("/register", post(register))
        .with_state(state.clone());

    if let Some(config) = rate_limit {
        login_router = login_router.layer(middleware::from_fn_with_state(
            config.clone(),
            rate_limit_login,
        ));
        register_router = register_router.layer(middleware::from_fn_with_state(
            config,
            rate_limit_register,
        ));
    }

    Router::new()
        .route("/me", get(me))
        .with_state(state)
        .merge(login_router)
        .merge(register_router)
}

/// Public identity view returned by login, registration and `/me`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub display_name: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            display_name: user.display_name,
        }
    }
}

/// Both token cookies for a freshly issued session.
fn session_cookies(
    session: &IssuedSession,
    secure: bool,
) -> AppendHeaders<[(axum::http::HeaderName, String); 2]> {
    AppendHeaders([
        (
            SET_COOKIE,
            access_cookie(&session.access.token, session.access.duration, secure),
        ),
        (
            SET_COOKIE,
            refresh_cookie(&session.refresh.token, session.refresh.duration, secure),
        ),
    ])
}

/// Argon2 is CPU bound, so it runs off the async workers.
async fn hash_password(
    credentials: Arc<dyn CredentialVerifier>,
    password: String,
) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || credentials.hash(&password))
        .await
        .internal_err("Password hashing task failed")?
        .internal_err("Failed to hash password")
}

async fn verify_password(
    credentials: Arc<dyn CredentialVerifier>,
    password: String,
    hash: String,
) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || credentials.verify(&password, &hash))
        .await
        .internal_err("Password verification task failed")?
        .internal_err("Failed to verify password")
}

async fn login(
    State(state): State<AuthState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let form = validate_login(&payload).map_err(|e| ApiError::bad_request(e.0))?;

    let user = state
        .db
        .users()
        .find_by_email_or_username(form.identifier)
        .await
        .db_err("Failed to look up user")?;

    let Some(user) = user else {
        // Same Argon2 work as a wrong password.
        hash_password(state.credentials.clone(), form.password.to_string()).await?;
        info!(identifier = %form.identifier, "Login failed: unknown user");
        return Err(ApiError::not_found("Failed to login"));
    };

    let matches = verify_password(
        state.credentials.clone(),
        form.password.to_string(),
        user.password_hash.clone(),
    )
    .await?;

    if !matches {
        warn!(identifier = %form.identifier, user_id = user.id, "Login failed: wrong password");
        return Err(ApiError::not_found("Failed to login"));
    }

    let session = state
        .sessions
        .issue(user.id)
        .await
        .map_err(|e| ApiError::from_session(e, "Failed to login", "Failed to login"))?;

    info!(user_id = user.id, "Login succeeded");

    Ok((
        StatusCode::OK,
        session_cookies(&session, state.secure_cookies),
        Json(PublicUser::from(user)),
    ))
}

async fn register(
    State(state): State<AuthState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let today = chrono::Utc::now().date_naive();
    let form = validate_registration(&payload, today).map_err(|e| {
        info!(reason = %e, "Registration rejected");
        ApiError::bad_request(e.0)
    })?;

    let password_hash =
        hash_password(state.credentials.clone(), form.password.to_string()).await?;
    let date_of_birth = form.date_of_birth.format("%Y-%m-%d").to_string();

    let new_user = NewUser {
        username: form.username,
        email: form.email,
        password_hash: &password_hash,
        display_name: form.display_name,
        date_of_birth: &date_of_birth,
        role: UserRole::Player,
    };

    let user_id = match state.db.users().create(&new_user).await {
        Ok(id) => id,
        Err(CreateUserError::Duplicate(field)) => {
            warn!(field = field.as_str(), "Registration conflict");
            return Err(ApiError::bad_request(format!(
                "Failed to register, {} already used",
                field.as_str()
            )));
        }
        Err(CreateUserError::Database(e)) => {
            return Err(ApiError::db_error("Failed to create user", e));
        }
    };

    let session = state
        .sessions
        .issue(user_id)
        .await
        .map_err(|e| ApiError::from_session(e, "Failed to register", "Failed to register"))?;

    info!(user_id, "User registered");

    Ok((
        StatusCode::CREATED,
        session_cookies(&session, state.secure_cookies),
        Json(PublicUser {
            id: user_id,
            username: form.username.to_string(),
            email: form.email.to_string(),
            role: UserRole::Player,
            display_name: form.display_name.to_string(),
        }),
    ))
}

async fn me(
    State(state): State<AuthState>,
    Auth(auth): Auth,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(auth.subject_id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| {
            warn!(user_id = auth.subject_id, "Valid access token for unknown user");
            ApiError::not_found("User not found")
        })?;

    Ok(Json(PublicUser::from(user)))
}
