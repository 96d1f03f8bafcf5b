//! Handler adapter tests.
//!
//! Exercises the callback-style adapter and the HTTP routes end to end
//! against a mocked issuer.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use guard_test_utils::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use token_guard::auth::FetcherOptions;
use token_guard::middleware::{CallbackAdapter, InvocationContext};

const KID: &str = "key-1";

fn context(domain: &str, authorization: Option<String>) -> InvocationContext {
    let secrets = HashMap::from([
        ("AUTH0_DOMAIN".to_string(), domain.to_string()),
        ("AUTH0_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
    ]);
    let headers = authorization
        .map(|value| HashMap::from([("authorization".to_string(), value)]))
        .unwrap_or_default();
    InvocationContext::new(secrets, headers)
}

// =============================================================================
// Callback-style adapter
// =============================================================================

#[tokio::test]
async fn test_callback_adapter_sets_user_before_handler() {
    let issuer = MockIssuer::start().await;
    issuer.serve_keys(&[PRIMARY_KEY.jwk(KID)], 1).await;

    let adapter = CallbackAdapter::new(
        Arc::new(local_validator(FetcherOptions::default())),
        |ctx: InvocationContext| async move {
            let user = ctx.user.ok_or("user not set")?;
            Ok::<_, String>(user.subject().unwrap_or_default().to_string())
        },
    );

    let token = TestTokenBuilder::new(&issuer.domain(), TEST_AUDIENCE)
        .for_user("auth0|bob")
        .sign_rs256(&PRIMARY_KEY, KID);

    let subject = adapter
        .invoke(context(&issuer.domain(), Some(bearer(&token))))
        .await
        .unwrap();

    assert_eq!(subject, "auth0|bob");
}

#[tokio::test]
async fn test_callback_adapter_reports_error_string() {
    let issuer = MockIssuer::start().await;
    issuer.serve_keys(&[PRIMARY_KEY.jwk(KID)], 0).await;

    let called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&called);
    let adapter = CallbackAdapter::new(
        Arc::new(local_validator(FetcherOptions::default())),
        move |_ctx: InvocationContext| {
            flag.store(true, Ordering::SeqCst);
            async { Ok::<(), String>(()) }
        },
    );

    let err = adapter
        .invoke(context(&issuer.domain(), Some("Basic abc".to_string())))
        .await
        .unwrap_err();

    assert_eq!(err, "UnauthorizedError: Authorization header is invalid.");
    assert!(!called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_callback_adapter_handler_errors_pass_through() {
    let issuer = MockIssuer::start().await;
    issuer.serve_keys(&[PRIMARY_KEY.jwk(KID)], 1).await;

    let adapter = CallbackAdapter::new(
        Arc::new(local_validator(FetcherOptions::default())),
        |_ctx: InvocationContext| async move { Err::<(), _>("handler failed".to_string()) },
    );

    let token = TestTokenBuilder::new(&issuer.domain(), TEST_AUDIENCE)
        .sign_rs256(&PRIMARY_KEY, KID);

    let err = adapter
        .invoke(context(&issuer.domain(), Some(bearer(&token))))
        .await
        .unwrap_err();

    assert_eq!(err, "handler failed");
}

// =============================================================================
// HTTP routes
// =============================================================================

#[tokio::test]
async fn test_me_returns_verified_claims() -> Result<()> {
    let issuer = MockIssuer::start().await;
    issuer.serve_keys(&[PRIMARY_KEY.jwk(KID)], 1).await;
    let server = TestGuardServer::spawn(&issuer.domain(), TEST_AUDIENCE).await?;

    let builder = TestTokenBuilder::new(&issuer.domain(), TEST_AUDIENCE)
        .for_user("auth0|carol")
        .with_scope("read:messages");
    let expected = builder.claims();
    let token = builder.sign_rs256(&PRIMARY_KEY, KID);

    let response = reqwest::Client::new()
        .get(format!("{}/v1/me", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, expected);

    Ok(())
}

#[tokio::test]
async fn test_me_without_header_is_unauthorized() -> Result<()> {
    let issuer = MockIssuer::start().await;
    issuer.serve_keys(&[PRIMARY_KEY.jwk(KID)], 0).await;
    let server = TestGuardServer::spawn(&issuer.domain(), TEST_AUDIENCE).await?;

    let response = reqwest::get(format!("{}/v1/me", server.url())).await?;

    assert_eq!(response.status(), 401);
    assert!(response.headers().contains_key("www-authenticate"));
    let body: serde_json::Value = response.json().await?;
    assert_eq!(
        body,
        serde_json::json!({
            "status": 401,
            "error": "UnauthorizedError",
            "error_description": "Authorization header is missing."
        })
    );

    Ok(())
}

#[tokio::test]
async fn test_me_with_rogue_signature_is_unauthorized() -> Result<()> {
    let issuer = MockIssuer::start().await;
    issuer.serve_keys(&[PRIMARY_KEY.jwk(KID)], 1).await;
    let server = TestGuardServer::spawn(&issuer.domain(), TEST_AUDIENCE).await?;

    let token = TestTokenBuilder::new(&issuer.domain(), TEST_AUDIENCE)
        .sign_rs256(&ROGUE_KEY, KID);

    let response = reqwest::Client::new()
        .get(format!("{}/v1/me", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"], "UnauthorizedError");

    Ok(())
}

#[tokio::test]
async fn test_health_and_metrics_are_public() -> Result<()> {
    let issuer = MockIssuer::start().await;
    let server = TestGuardServer::spawn(&issuer.domain(), TEST_AUDIENCE).await?;

    let health = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(health.status(), 200);
    let body: serde_json::Value = health.json().await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["issuers"], 0);

    let metrics = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(metrics.status(), 200);

    Ok(())
}
