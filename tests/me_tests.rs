//! Tests for the access guard in front of `/me`.

mod common;

use axum::http::StatusCode;
use common::*;
use tokenward::jwt::TokenCodec;

const ME: &str = "/api/v1/auth/me";

#[tokio::test]
async fn test_me_returns_identity() {
    let app = create_test_app().await;
    let user_id = create_user(&app.db, "alice", "alice@example.com", PASSWORD).await;
    let (access, _) = login(&app, "alice", PASSWORD).await;

    let response = app
        .send(cookie_request("GET", ME, &[("access_token", &access)]))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json,
        serde_json::json!({
            "id": user_id,
            "username": "alice",
            "email": "alice@example.com",
            "role": "PLAYER",
            "displayName": "Test User",
        })
    );
}

#[tokio::test]
async fn test_me_without_token() {
    let app = create_test_app().await;

    let response = app.send(cookie_request("GET", ME, &[])).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Unauthorized");
}

#[tokio::test]
async fn test_me_rejects_refresh_token() {
    let app = create_test_app().await;
    create_user(&app.db, "alice", "alice@example.com", PASSWORD).await;
    let (_, refresh) = login(&app, "alice", PASSWORD).await;

    let response = app
        .send(cookie_request("GET", ME, &[("access_token", &refresh)]))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_rejects_expired_token() {
    let app = create_test_app().await;
    let user_id = create_user(&app.db, "alice", "alice@example.com", PASSWORD).await;
    let expired = TokenCodec::access(ACCESS_SECRET, ACCESS_TTL)
        .issue_at(user_id, 1_000)
        .unwrap();

    let response = app
        .send(cookie_request("GET", ME, &[("access_token", &expired.token)]))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_rejects_tampered_token() {
    let app = create_test_app().await;
    create_user(&app.db, "alice", "alice@example.com", PASSWORD).await;
    let (access, _) = login(&app, "alice", PASSWORD).await;

    let mut parts: Vec<String> = access.split('.').map(String::from).collect();
    parts[2] = parts[2].chars().rev().collect();
    let tampered = parts.join(".");

    let response = app
        .send(cookie_request("GET", ME, &[("access_token", &tampered)]))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_unknown_subject() {
    let app = create_test_app().await;
    let orphan = app.keys.access.issue(9999).unwrap();

    let response = app
        .send(cookie_request("GET", ME, &[("access_token", &orphan.token)]))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["message"], "User not found");
}

#[tokio::test]
async fn test_access_token_outlives_logout() {
    let app = create_test_app().await;
    create_user(&app.db, "alice", "alice@example.com", PASSWORD).await;
    let (access, refresh) = login(&app, "alice", PASSWORD).await;

    let response = app
        .send(cookie_request(
            "POST",
            "/api/v1/auth/token/logout",
            &[("refresh_token", &refresh)],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The guard never consults the ledger, so the access token stays valid
    // until it expires.
    let response = app
        .send(cookie_request("GET", ME, &[("access_token", &access)]))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let app = create_test_app().await;

    let response = app.send(cookie_request("GET", "/api/health", &[])).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}
