//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use serde_json::{Value, json};
use tokenward::{
    ServerConfig,
    cli::IpExtractor,
    create_app,
    db::{Database, NewUser, UserRole},
    jwt::TokenKeys,
    password::{Argon2Verifier, CredentialVerifier},
    rate_limit::RateLimitSettings,
};
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-key-for-testing";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-key-for-testing";
pub const ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
pub const REFRESH_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
pub const PASSWORD: &str = "#Password123";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub keys: TokenKeys,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Argon2 with minimal cost so tests stay fast.
pub fn fast_credentials() -> Arc<dyn CredentialVerifier> {
    Arc::new(Argon2Verifier::with_params(1024, 1, 1).unwrap())
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(None, None).await
}

pub async fn create_test_app_with(
    rate_limit: Option<RateLimitSettings>,
    ip_extractor: Option<IpExtractor>,
) -> TestApp {
    build_test_app(rate_limit, ip_extractor, fast_credentials()).await
}

pub async fn create_test_app_with_credentials(
    credentials: Arc<dyn CredentialVerifier>,
) -> TestApp {
    build_test_app(None, None, credentials).await
}

async fn build_test_app(
    rate_limit: Option<RateLimitSettings>,
    ip_extractor: Option<IpExtractor>,
    credentials: Arc<dyn CredentialVerifier>,
) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        access_ttl: ACCESS_TTL,
        refresh_ttl: REFRESH_TTL,
        secure_cookies: false,
        credentials,
        rate_limit,
        ip_extractor,
    };
    let keys = TokenKeys::new(ACCESS_SECRET, REFRESH_SECRET, ACCESS_TTL, REFRESH_TTL);
    TestApp {
        router: create_app(&config),
        db,
        keys,
    }
}

/// Insert a user directly, bypassing the HTTP layer. Returns the user ID.
pub async fn create_user(db: &Database, username: &str, email: &str, password: &str) -> i64 {
    let hash = fast_credentials().hash(password).unwrap();
    db.users()
        .create(&NewUser {
            username,
            email,
            password_hash: &hash,
            display_name: "Test User",
            date_of_birth: "1990-01-01",
            role: UserRole::Player,
        })
        .await
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn cookie_request(method: &str, uri: &str, cookies: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if !cookies.is_empty() {
        let header_value = cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header(header::COOKIE, header_value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn register_body(username: &str, email: &str) -> Value {
    json!({
        "username": username,
        "email": email,
        "password": PASSWORD,
        "passwordConfirmation": PASSWORD,
        "displayName": "John Doe",
        "dateOfBirth": "2000-01-01",
    })
}

pub fn login_body(identifier: &str, password: &str) -> Value {
    json!({ "emailOrUsername": identifier, "password": password })
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// All Set-Cookie header values of a response.
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Value of a cookie being set (not cleared).
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    cookies.iter().find_map(|c| {
        let value = c.strip_prefix(name)?.strip_prefix('=')?.split(';').next()?;
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Check if cookies contain a token being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String], name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=;", name)) && c.contains("Max-Age=0"))
}

/// Log in through the API and return (access_token, refresh_token).
pub async fn login(app: &TestApp, identifier: &str, password: &str) -> (String, String) {
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/auth/login",
            &login_body(identifier, password),
        ))
        .await;
    assert_eq!(response.status(), 200);
    let cookies = extract_set_cookies(&response);
    (
        cookie_value(&cookies, "access_token").unwrap(),
        cookie_value(&cookies, "refresh_token").unwrap(),
    )
}

pub async fn count_ledger_rows(db: &Database, user_id: i64) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    row.0
}
