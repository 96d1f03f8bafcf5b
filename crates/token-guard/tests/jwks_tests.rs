//! Key-set retrieval tests.
//!
//! Covers fetch failures, key filtering and cache refresh behavior of the
//! per-issuer signing-key fetcher.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use guard_test_utils::*;
use std::collections::HashMap;
use std::time::Duration;
use token_guard::auth::FetcherOptions;
use token_guard::{TokenValidator, ValidationConfig, ValidationError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

const KID: &str = "key-1";

async fn validate_signed(
    validator: &TokenValidator,
    issuer: &MockIssuer,
    kid: &str,
) -> Result<token_guard::VerifiedIdentity, ValidationError> {
    let token = TestTokenBuilder::new(&issuer.domain(), TEST_AUDIENCE)
        .sign_rs256(&PRIMARY_KEY, kid);
    let headers = HashMap::from([("authorization".to_string(), bearer(&token))]);

    validator
        .validate(&ValidationConfig::new(issuer.domain(), TEST_AUDIENCE), &headers)
        .await
}

// =============================================================================
// Fetch failures surface as 401 with the fetch error message
// =============================================================================

#[tokio::test]
async fn test_http_error_status() {
    let issuer = MockIssuer::start().await;
    issuer.serve_status(503, 1).await;
    let validator = local_validator(FetcherOptions::default());

    let err = validate_signed(&validator, &issuer, KID).await.unwrap_err();

    assert_eq!(err.status(), 401);
    assert_eq!(err.description(), "Http Error 503");
}

#[tokio::test]
async fn test_malformed_key_set() {
    let issuer = MockIssuer::start().await;
    issuer.serve_raw("this is not json", 1).await;
    let validator = local_validator(FetcherOptions::default());

    let err = validate_signed(&validator, &issuer, KID).await.unwrap_err();

    assert_eq!(err.status(), 401);
    assert!(
        err.description().starts_with("Invalid JWKS response: "),
        "unexpected description: {}",
        err.description()
    );
}

#[tokio::test]
async fn test_empty_key_set() {
    let issuer = MockIssuer::start().await;
    issuer.serve_keys(&[], 1).await;
    let validator = local_validator(FetcherOptions::default());

    let err = validate_signed(&validator, &issuer, KID).await.unwrap_err();

    assert_eq!(err.status(), 401);
    assert_eq!(
        err.description(),
        "The JWKS endpoint did not contain any keys"
    );
}

#[tokio::test]
async fn test_key_set_without_signing_keys() {
    let issuer = MockIssuer::start().await;
    let mut encryption_key = PRIMARY_KEY.jwk(KID);
    encryption_key["use"] = "enc".into();
    issuer
        .serve_keys(
            &[
                encryption_key,
                serde_json::json!({"kty": "EC", "kid": "ec-key", "crv": "P-256"}),
            ],
            1,
        )
        .await;
    let validator = local_validator(FetcherOptions::default());

    let err = validate_signed(&validator, &issuer, KID).await.unwrap_err();

    assert_eq!(err.status(), 401);
    assert_eq!(
        err.description(),
        "The JWKS endpoint did not contain any signing keys"
    );
}

#[tokio::test]
async fn test_unreachable_issuer() {
    // Nothing listens on port 1
    let domain = "127.0.0.1:1".to_string();

    let validator = local_validator(FetcherOptions {
        http_timeout: Duration::from_secs(2),
        ..FetcherOptions::default()
    });
    let token =
        TestTokenBuilder::new(&domain, TEST_AUDIENCE).sign_rs256(&PRIMARY_KEY, KID);
    let headers = HashMap::from([("authorization".to_string(), bearer(&token))]);

    let err = validator
        .validate(&ValidationConfig::new(domain, TEST_AUDIENCE), &headers)
        .await
        .unwrap_err();

    assert_eq!(err.status(), 401);
    assert!(!err.description().is_empty());
}

#[tokio::test]
async fn test_failed_fetch_is_retried_on_next_validation() {
    let issuer = MockIssuer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(issuer.server())
        .await;
    issuer.serve_keys(&[PRIMARY_KEY.jwk(KID)], 1).await;
    let validator = local_validator(FetcherOptions::default());

    let err = validate_signed(&validator, &issuer, KID).await.unwrap_err();
    assert_eq!(err.description(), "Http Error 500");

    assert!(validate_signed(&validator, &issuer, KID).await.is_ok());
}

// =============================================================================
// Unknown key IDs and refresh
// =============================================================================

#[tokio::test]
async fn test_unknown_kid_within_refresh_interval_does_not_refetch() {
    let issuer = MockIssuer::start().await;
    issuer.serve_keys(&[PRIMARY_KEY.jwk(KID)], 1).await;
    let validator = local_validator(FetcherOptions::default());

    assert!(validate_signed(&validator, &issuer, KID).await.is_ok());

    let err = validate_signed(&validator, &issuer, "unknown-kid")
        .await
        .unwrap_err();

    assert_eq!(err.status(), 401);
    assert_eq!(
        err.description(),
        "Unable to find a signing key that matches 'unknown-kid'"
    );
    assert_eq!(issuer.jwks_requests().await, 1);
}

#[tokio::test]
async fn test_unknown_kid_on_first_fetch() {
    let issuer = MockIssuer::start().await;
    issuer.serve_keys(&[PRIMARY_KEY.jwk("other-key")], 1).await;
    let validator = local_validator(FetcherOptions::default());

    let err = validate_signed(&validator, &issuer, KID).await.unwrap_err();

    assert_eq!(
        err.description(),
        "Unable to find a signing key that matches 'key-1'"
    );
}

#[tokio::test]
async fn test_rotated_key_picked_up_after_refresh_interval() {
    let issuer = MockIssuer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(jwks_document(&[PRIMARY_KEY.jwk("old-key")])),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(issuer.server())
        .await;
    issuer.serve_keys(&[PRIMARY_KEY.jwk("new-key")], 1).await;

    let validator = local_validator(FetcherOptions {
        min_refresh_interval: Duration::ZERO,
        ..FetcherOptions::default()
    });

    assert!(validate_signed(&validator, &issuer, "old-key").await.is_ok());
    assert!(validate_signed(&validator, &issuer, "new-key").await.is_ok());
    assert_eq!(issuer.jwks_requests().await, 2);
}

#[tokio::test]
async fn test_expired_cache_is_refetched() {
    let issuer = MockIssuer::start().await;
    issuer.serve_keys(&[PRIMARY_KEY.jwk(KID)], 2).await;

    let validator = local_validator(FetcherOptions {
        cache_ttl: Duration::ZERO,
        ..FetcherOptions::default()
    });

    assert!(validate_signed(&validator, &issuer, KID).await.is_ok());
    assert!(validate_signed(&validator, &issuer, KID).await.is_ok());
    assert_eq!(issuer.jwks_requests().await, 2);
}
