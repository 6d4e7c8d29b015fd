//! End-to-end HTTP tests driving the router the way a browser would.
//!
//! Each request carries whatever the previous response handed out (the
//! cookie, the `ETag`, or both), or deliberately drops a channel.
#![allow(clippy::expect_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, ETAG, SET_COOKIE},
    },
    response::Response,
};
use serde_json::Value;
use tower::ServiceExt;
use twinpath_authn::{
    IdentityConfig, TokenCodec,
    testutil::{TEST_SECRET, sign_with_secret, tamper_signature, test_config},
};
use twinpath_server::{AppState, build_router};
use twinpath_storage::{MemoryRecoveryStore, MemoryStoreConfig};

/// What a client keeps from one `/token` response.
struct Issued {
    token: String,
    etag: String,
    identifier: String,
}

fn app_with(config: &IdentityConfig, store: MemoryRecoveryStore) -> Router {
    build_router(AppState::new(config, Arc::new(store)).expect("valid config"))
}

fn app() -> Router {
    app_with(&test_config(), MemoryRecoveryStore::new())
}

async fn send(app: &Router, uri: &str, headers: &[(&str, &str)]) -> Response {
    let mut request = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("router is infallible")
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn identifier_of(token: &str) -> String {
    TokenCodec::new(TEST_SECRET.as_bytes())
        .verify(token)
        .expect("issued token must verify")
        .identifier()
        .to_owned()
}

async fn request_token(app: &Router, headers: &[(&str, &str)]) -> Issued {
    let response = send(app, "/token", headers).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("Set-Cookie")
        .to_str()
        .expect("ascii")
        .to_owned();
    let etag = response.headers().get(ETAG).expect("ETag").to_str().expect("ascii").to_owned();

    let cookie_token = set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("twinpath-id="))
        .expect("cookie pair")
        .to_owned();
    let body = json_body(response).await;
    let token = body["token"].as_str().expect("token field").to_owned();
    assert_eq!(token, cookie_token, "body and cookie must carry the same token");

    Issued { identifier: identifier_of(&token), token, etag }
}

fn cookie(issued: &Issued) -> String {
    format!("twinpath-id={}", issued.token)
}

// ---------------------------------------------------------------------------
// Recovery scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_signals_issue_unrelated_identities() {
    let app = app();
    let first = request_token(&app, &[]).await;
    let second = request_token(&app, &[]).await;

    assert_ne!(first.identifier, second.identifier);
    assert_ne!(first.etag, second.etag);
}

#[tokio::test]
async fn validator_alone_recovers_identity_and_etag() {
    let app = app();
    let first = request_token(&app, &[]).await;

    let recovered = request_token(&app, &[("if-none-match", first.etag.as_str())]).await;

    assert_eq!(recovered.identifier, first.identifier);
    assert_eq!(recovered.etag, first.etag, "the same validator key is re-emitted");
}

#[tokio::test]
async fn cookie_wins_over_garbage_validator() {
    let app = app();
    let first = request_token(&app, &[]).await;

    let cookie_header = cookie(&first);
    let recovered = request_token(
        &app,
        &[("cookie", cookie_header.as_str()), ("if-none-match", "\"not-a-real-key\"")],
    )
    .await;

    assert_eq!(recovered.identifier, first.identifier);
    assert_ne!(recovered.etag, "\"not-a-real-key\"");
}

#[tokio::test]
async fn cookie_alone_recovers_identity_with_new_validator() {
    let app = app();
    let first = request_token(&app, &[]).await;

    let cookie_header = cookie(&first);
    let recovered = request_token(&app, &[("cookie", cookie_header.as_str())]).await;

    assert_eq!(recovered.identifier, first.identifier);
    assert_ne!(recovered.etag, first.etag);

    // The new validator works on its own afterwards.
    let again = request_token(&app, &[("if-none-match", recovered.etag.as_str())]).await;
    assert_eq!(again.identifier, first.identifier);
}

#[tokio::test]
async fn weak_validator_is_accepted() {
    let app = app();
    let first = request_token(&app, &[]).await;

    let weak = format!("W/{}", first.etag);
    let recovered = request_token(&app, &[("if-none-match", weak.as_str())]).await;
    assert_eq!(recovered.identifier, first.identifier);
}

#[tokio::test]
async fn tampered_cookie_falls_back_to_validator() {
    let app = app();
    let first = request_token(&app, &[]).await;

    let tampered = format!("twinpath-id={}", tamper_signature(&first.token));
    let recovered = request_token(
        &app,
        &[("cookie", tampered.as_str()), ("if-none-match", first.etag.as_str())],
    )
    .await;

    assert_eq!(recovered.identifier, first.identifier);
    assert_eq!(recovered.etag, first.etag);
}

#[tokio::test]
async fn foreign_cookie_without_validator_gets_fresh_identity() {
    let app = app();
    let forged = format!("twinpath-id={}", sign_with_secret(b"attacker", "victim"));

    let issued = request_token(&app, &[("cookie", forged.as_str())]).await;
    assert_ne!(issued.identifier, "victim");
}

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cookie_lifetime_follows_configuration() {
    let config = IdentityConfig::builder()
        .secret(TEST_SECRET)
        .cookie_name("mein-cookie")
        .cookie_ttl(Duration::from_secs(3600))
        .build()
        .expect("config");
    let app = app_with(&config, MemoryRecoveryStore::new());

    let response = send(&app, "/token", &[]).await;
    let set_cookie =
        response.headers().get(SET_COOKIE).expect("Set-Cookie").to_str().expect("ascii");

    assert!(set_cookie.starts_with("mein-cookie="));
    assert!(set_cookie.contains("Max-Age=3600"));
    assert!(set_cookie.contains("Expires="));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn unsupported_accept_is_not_acceptable() {
    let app = app();
    let response = send(&app, "/token", &[("accept", "text/html")]).await;

    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    assert!(response.headers().get(SET_COOKIE).is_some());
    assert!(response.headers().get(ETAG).is_some());
    assert_eq!(json_body(response).await["error"], "Not Acceptable");
}

#[tokio::test]
async fn raw_jwt_representation_carries_the_cookie_token() {
    let app = app();
    let response = send(&app, "/token", &[("accept", "application/jwt")]).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).expect("content type"), "application/jwt");
    let set_cookie =
        response.headers().get(SET_COOKIE).expect("Set-Cookie").to_str().expect("ascii").to_owned();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let token = std::str::from_utf8(&bytes).expect("utf8");

    assert!(set_cookie.starts_with(&format!("twinpath-id={token};")));
}

#[tokio::test]
async fn store_exhaustion_is_an_internal_error() {
    let store_config = MemoryStoreConfig::builder().max_bindings(1).build().expect("store config");
    let app = app_with(&test_config(), MemoryRecoveryStore::with_config(store_config));

    request_token(&app, &[]).await;
    let response = send(&app, "/token", &[]).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let body = json_body(response).await;
    assert_eq!(body["error"], "internal error", "internals must not leak");
}

// ---------------------------------------------------------------------------
// Protected route
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_view_accepts_bearer_token_from_token_route() {
    let app = app();
    let issued = request_token(&app, &[]).await;

    let bearer = format!("Bearer {}", issued.token);
    let response = send(&app, "/api-view", &[("authorization", bearer.as_str())]).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["invoice"], issued.identifier.as_str());
}

#[tokio::test]
async fn api_view_accepts_query_token() {
    let app = app();
    let issued = request_token(&app, &[]).await;

    let uri = format!("/api-view?token={}", issued.token);
    let response = send(&app, &uri, &[]).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["invoice"], issued.identifier.as_str());
}

#[tokio::test]
async fn api_view_rejects_invalid_tokens() {
    let app = app();
    let issued = request_token(&app, &[]).await;

    let cases = [
        format!("Bearer {}", tamper_signature(&issued.token)),
        format!("Bearer {}", sign_with_secret(b"attacker", "victim")),
        "Bearer not-a-token".to_owned(),
    ];
    for header in cases {
        let response = send(&app, "/api-view", &[("authorization", header.as_str())]).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{header}");
        assert_eq!(json_body(response).await["error"], "invalid token");
    }
}

#[tokio::test]
async fn api_view_without_token_is_unauthorized() {
    let app = app();
    let response = send(&app, "/api-view", &[("authorization", "Basic dXNlcjpwYXNz")]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_ok() {
    let app = app();
    let response = send(&app, "/health", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}
