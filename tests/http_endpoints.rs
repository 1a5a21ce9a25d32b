//! HTTP endpoint behavior over a mock identity provider.

mod common;

use std::sync::Arc;

use adit_auth::{router, AuthState, MockIdentityProvider, SessionConfig};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::manager_with;
use serde_json::Value;
use tower::ServiceExt;

fn app() -> Router {
    let (manager, _) = manager_with(Arc::new(MockIdentityProvider::new()), SessionConfig::default());
    router(AuthState::new(Arc::new(manager)))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("POST").uri(uri)
}

#[tokio::test]
async fn test_authorize_redirects_to_provider() {
    let response = app()
        .oneshot(Request::builder().uri("/auth/authorize").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://mock.example.com/oauth/authorize"));
}

#[tokio::test]
async fn test_callback_issues_tokens() {
    let response = app()
        .oneshot(post("/auth/callback?code=abc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::AUTHORIZATION], "Bearer at-abc");
    assert_eq!(response.headers()["x-refresh-token"], "rt-abc");

    let body = json_body(response).await;
    assert_eq!(body["access_token"], "at-abc");
    assert_eq!(body["refresh_token"], "rt-abc");
    assert_eq!(body["user"]["email"], "mock@example.com");
    assert_eq!(body["user"]["role"], "GUEST");
}

#[tokio::test]
async fn test_callback_without_code_is_bad_request() {
    let response = app()
        .oneshot(post("/auth/callback").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "InvalidRequest");
}

#[tokio::test]
async fn test_refresh_rotation_and_reuse() {
    let app = app();
    app.clone()
        .oneshot(post("/auth/callback?code=abc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            post("/auth/refresh")
                .header("x-refresh-token", "rt-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = json_body(response).await;
    assert_ne!(rotated["refresh_token"], "rt-abc");

    let response = app
        .clone()
        .oneshot(
            post("/auth/refresh")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"refresh_token":"rt-abc"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "RefreshTokenBlacklisted");
    assert_eq!(body["code"], "AUTH-014");
}

#[tokio::test]
async fn test_refresh_without_token_is_bad_request() {
    let response = app()
        .oneshot(post("/auth/refresh").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_and_logout() {
    let app = app();
    app.clone()
        .oneshot(post("/auth/callback?code=abc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let me = || {
        Request::builder()
            .uri("/auth/me")
            .header(header::AUTHORIZATION, "Bearer at-abc")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(me()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["email"], "mock@example.com");

    let response = app
        .clone()
        .oneshot(
            post("/auth/logout")
                .header(header::AUTHORIZATION, "Bearer at-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["already_revoked"], false);

    let response = app.clone().oneshot(me()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    let body = json_body(response).await;
    assert_eq!(body["kind"], "TokenRevoked");
}

#[tokio::test]
async fn test_missing_bearer_is_token_not_found() {
    let response = app()
        .oneshot(Request::builder().uri("/auth/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "TokenNotFound");
    assert_eq!(body["code"], "AUTH-005");
}
