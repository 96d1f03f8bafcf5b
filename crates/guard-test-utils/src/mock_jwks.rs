//! Mocked issuer serving a key-set document.
//!
//! Wraps a wiremock [`MockServer`]. Expectations set with `expected_calls`
//! are verified when the issuer is dropped.

use crate::crypto_fixtures::jwks_document;
use serde_json::Value;
use std::sync::Arc;
use token_guard::auth::{FetcherOptions, KeyStore, TokenValidator};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the key store fetches keys from.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A local issuer reachable over plain HTTP.
pub struct MockIssuer {
    server: MockServer,
}

impl MockIssuer {
    /// Start a mock issuer on a random local port.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Issuer domain (`host:port`), as configured in `AUTH0_DOMAIN`.
    pub fn domain(&self) -> String {
        self.server.address().to_string()
    }

    /// The underlying mock server.
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Serve `keys` as the key-set, expecting exactly `expected_calls` fetches.
    pub async fn serve_keys(&self, keys: &[Value], expected_calls: u64) {
        self.serve(
            ResponseTemplate::new(200).set_body_json(jwks_document(keys)),
            expected_calls,
        )
        .await;
    }

    /// Respond to key-set requests with `status` and an empty body.
    pub async fn serve_status(&self, status: u16, expected_calls: u64) {
        self.serve(ResponseTemplate::new(status), expected_calls)
            .await;
    }

    /// Respond to key-set requests with a raw body.
    pub async fn serve_raw(&self, body: &str, expected_calls: u64) {
        self.serve(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/json"),
            expected_calls,
        )
        .await;
    }

    /// Mount a response for key-set requests.
    pub async fn serve(&self, response: ResponseTemplate, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// Number of key-set requests received so far.
    pub async fn jwks_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == JWKS_PATH)
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Validator that reaches issuers over plain HTTP, for use with [`MockIssuer`].
pub fn local_validator(options: FetcherOptions) -> TokenValidator {
    TokenValidator::new(
        Arc::new(KeyStore::with_scheme("http", options)),
        common::jwt::DEFAULT_CLOCK_SKEW,
    )
}
