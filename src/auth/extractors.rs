//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;

/// Check the access token cookie and resolve the identity it carries.
fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthBackend,
{
    let access_token =
        get_cookie(&parts.headers, ACCESS_COOKIE_NAME).ok_or(AuthErrorKind::NotAuthenticated)?;

    let claims = state.tokens().access.verify(access_token).map_err(|e| {
        debug!(path = %parts.uri.path(), reason = %e, "Access token rejected");
        AuthErrorKind::InvalidToken
    })?;

    Ok(AuthenticatedUser {
        subject_id: claims.subject_id,
        claims,
    })
}

/// Extractor for API endpoints that require a valid access token.
/// Rejects with 401 before the handler body runs.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .map(Auth)
            .map_err(ApiAuthError::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{TokenCodec, TokenKeys};
    use axum::http::{Request, header};
    use std::time::Duration;

    struct TestState {
        keys: TokenKeys,
    }

    impl HasAuthBackend for TestState {
        fn tokens(&self) -> &TokenKeys {
            &self.keys
        }
    }

    fn state() -> TestState {
        TestState {
            keys: TokenKeys::new(
                b"test-access-secret-key-for-testing",
                b"test-refresh-secret-key-for-testing",
                Duration::from_secs(60),
                Duration::from_secs(3600),
            ),
        }
    }

    fn parts_with_cookie(cookie: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/auth/me");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_valid_access_token() {
        let state = state();
        let issued = state.keys.access.issue(7).unwrap();
        let mut parts = parts_with_cookie(Some(&format!("access_token={}", issued.token)));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.subject_id, 7);
        assert_eq!(user.claims, issued.claims);
    }

    #[tokio::test]
    async fn test_missing_cookie() {
        let mut parts = parts_with_cookie(None);

        let err = Auth::from_request_parts(&mut parts, &state())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), AuthErrorKind::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let state = state();
        let refresh = state.keys.refresh.issue(7).unwrap();
        let mut parts = parts_with_cookie(Some(&format!("access_token={}", refresh.token)));

        let err = Auth::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), AuthErrorKind::InvalidToken);
    }

    #[tokio::test]
    async fn test_expired_access_token() {
        let state = state();
        let codec = TokenCodec::access(b"test-access-secret-key-for-testing", Duration::from_secs(60));
        let expired = codec.issue_at(7, 1_000).unwrap();
        let mut parts = parts_with_cookie(Some(&format!("access_token={}", expired.token)));

        let err = Auth::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), AuthErrorKind::InvalidToken);
    }
}
