// SPDX-License-Identifier: MIT

//! Authentication guard tests.
//!
//! Every failure path in the guard must surface as a bare 401 — absent
//! token, malformed token, expired token, wrong token class, and a token
//! whose user cannot be resolved all look identical to the caller.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

mod common;

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

fn signed_token(signing_key: &[u8], sub: &str, ttl_secs: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: sub.to_string(),
        iat: (now + ttl_secs.min(0)) as usize,
        exp: (now + ttl_secs) as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

async fn get_me(app: axum::Router, request: Request<Body>) -> StatusCode {
    app.oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = common::create_test_app();

    let status = get_me(
        app,
        Request::builder()
            .method("GET")
            .uri("/api/me")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_token() {
    let (app, _) = common::create_test_app();

    let status = get_me(
        app,
        Request::builder()
            .method("POST")
            .uri("/auth/logout")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_garbage_token() {
    let (app, _) = common::create_test_app();

    let status = get_me(
        app,
        Request::builder()
            .method("GET")
            .uri("/api/me")
            .header(header::AUTHORIZATION, "Bearer invalid.token.here")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_garbage_cookie() {
    let (app, _) = common::create_test_app();

    let status = get_me(
        app,
        Request::builder()
            .method("GET")
            .uri("/api/me")
            .header(header::COOKIE, "accessToken=invalid.token.here")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_expired_token() {
    let (app, state) = common::create_test_app();
    // Well past the validation leeway
    let token = signed_token(&state.config.access_token_secret, "user-123", -3600);

    let status = get_me(
        app,
        Request::builder()
            .method("GET")
            .uri("/api/me")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_rejected_as_access_token() {
    let (app, state) = common::create_test_app();
    let pair = state.tokens.issue_pair("user-123").unwrap();

    let status = get_me(
        app,
        Request::builder()
            .method("GET")
            .uri("/api/me")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", pair.refresh_token),
            )
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unresolvable_user_collapses_to_unauthorized() {
    // Valid signature, but the store cannot resolve the user. The guard
    // must not leak that distinction.
    let (app, state) = common::create_test_app();
    let pair = state.tokens.issue_pair("user-123").unwrap();

    let status = get_me(
        app,
        Request::builder()
            .method("GET")
            .uri("/api/me")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", pair.access_token),
            )
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/auth/login")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}
