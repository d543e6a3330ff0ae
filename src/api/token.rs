//! Token lifecycle endpoints. The refresh token cookie is scoped to this
//! router's path.
//!
//! - GET `/renew` - Exchange the refresh token for a new access token
//! - POST `/logout` - Revoke the refresh token and clear both cookies

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
};

use super::AuthState;
use super::error::{ApiError, MessageResponse};
use crate::auth::{
    REFRESH_COOKIE_NAME, access_cookie, clear_access_cookie, clear_refresh_cookie, get_cookie,
};

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/renew", get(renew))
        .route("/logout", post(logout))
        .with_state(state)
}

/// Issue a new access token. The refresh token is left as is.
async fn renew(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let refresh_token = get_cookie(&headers, REFRESH_COOKIE_NAME);

    let access = state
        .sessions
        .renew(refresh_token)
        .await
        .map_err(|e| ApiError::from_session(e, "Unauthorized", "Failed to renew token"))?;

    Ok((
        StatusCode::OK,
        [(
            SET_COOKIE,
            access_cookie(&access.token, access.duration, state.secure_cookies),
        )],
        MessageResponse::new("Token renewed"),
    ))
}

/// Revoke the refresh token. Both cookies are cleared whatever the outcome.
async fn logout(State(state): State<AuthState>, headers: HeaderMap) -> Response {
    let clear = AppendHeaders([
        (SET_COOKIE, clear_access_cookie(state.secure_cookies)),
        (SET_COOKIE, clear_refresh_cookie(state.secure_cookies)),
    ]);

    let refresh_token = get_cookie(&headers, REFRESH_COOKIE_NAME);

    match state.sessions.revoke(refresh_token).await {
        Ok(()) => (StatusCode::OK, clear, MessageResponse::new("Logged out")).into_response(),
        Err(e) => (
            clear,
            ApiError::from_session(e, "Unauthorized", "Error logging out"),
        )
            .into_response(),
    }
}
