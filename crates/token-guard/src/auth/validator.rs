//! Bearer token validation pipeline.
//!
//! Validates RS256 JWTs against the signing keys an issuer publishes at
//! `https://{domain}/.well-known/jwks.json`.
//!
//! # Pipeline
//!
//! Checks run in strict order and stop at the first failure:
//!
//! 1. Configuration - issuer domain and audience present
//! 2. `Authorization` header present
//! 3. Header shape - exactly `Bearer <token>`
//! 4. Unverified decode of header and payload
//! 5. `alg` is RS256
//! 6. `kid` present
//! 7. Signing key resolved through the [`KeyStore`]
//! 8. Signature, `exp`/`nbf`, `aud` and `iss` verified
//!
//! # Security
//!
//! - Steps 1-6 never touch the network, so unsupported algorithms and
//!   malformed tokens cannot trigger key fetches
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Panics inside the pipeline are caught and reported as 500s

use crate::auth::headers::HeaderSource;
use crate::auth::identity::VerifiedIdentity;
use crate::auth::key_store::KeyStore;
use crate::config::{issuer_for, ValidationConfig};
use crate::errors::{AuthError, ValidationError};
use crate::observability::metrics;
use common::jwt::{decode_unverified, DEFAULT_CLOCK_SKEW};
use futures::FutureExt;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// The only accepted signing algorithm, as it appears in the JOSE header.
const RS256: &str = "RS256";

/// Claims that must be present for a token to verify. `exp` and `nbf` are
/// enforced only when the token carries them.
const REQUIRED_CLAIMS: &[&str] = &["aud", "iss"];

/// Validates bearer tokens for any issuer named by a [`ValidationConfig`].
pub struct TokenValidator {
    key_store: Arc<KeyStore>,

    /// Leeway applied to `exp` and `nbf`.
    clock_skew: Duration,
}

impl TokenValidator {
    /// Create a validator resolving keys through `key_store`.
    pub fn new(key_store: Arc<KeyStore>, clock_skew: Duration) -> Self {
        Self {
            key_store,
            clock_skew,
        }
    }

    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.key_store
    }

    /// Validate the bearer token in `headers`.
    ///
    /// Always resolves to exactly one outcome: the verified claim set, or a
    /// [`ValidationError`] describing the first check that failed.
    #[instrument(skip_all, name = "guard.auth.validate")]
    pub async fn validate<H>(
        &self,
        config: &ValidationConfig,
        headers: &H,
    ) -> Result<VerifiedIdentity, ValidationError>
    where
        H: HeaderSource + ?Sized,
    {
        let start = Instant::now();

        let outcome = AssertUnwindSafe(self.run_pipeline(config, headers))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(AuthError::Internal(panic_message(panic.as_ref()))));

        let duration = start.elapsed();
        match outcome {
            Ok(identity) => {
                metrics::record_token_validation("success", None, duration);
                tracing::debug!(target: "guard.auth.validator", "Token validated successfully");
                Ok(identity)
            }
            Err(err) => {
                metrics::record_token_validation("error", Some(err.error_type()), duration);
                if err.status_code() >= 500 {
                    tracing::error!(target: "guard.auth.validator", error = %err, "Token validation failed");
                } else {
                    tracing::debug!(target: "guard.auth.validator", error = %err, "Token rejected");
                }
                Err(err.into())
            }
        }
    }

    async fn run_pipeline<H>(
        &self,
        config: &ValidationConfig,
        headers: &H,
    ) -> Result<VerifiedIdentity, AuthError>
    where
        H: HeaderSource + ?Sized,
    {
        let (domain, audience) = config.require()?;

        let authorization = headers.authorization();
        let token = extract_bearer_token(authorization.as_deref())?;

        let decoded = decode_unverified(token).map_err(|e| {
            tracing::debug!(target: "guard.auth.validator", error = %e, "Token decode failed");
            AuthError::InvalidToken
        })?;

        if decoded.header.alg.as_deref() != Some(RS256) {
            tracing::debug!(
                target: "guard.auth.validator",
                alg = ?decoded.header.alg,
                "Rejected token with unsupported algorithm"
            );
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let kid = decoded.header.kid().ok_or(AuthError::MissingKid)?;

        let fetcher = self.key_store.get_fetcher(domain).await;
        let key = fetcher.resolve_key(kid).await?;

        let claims = verify_token(token, &key, audience, &issuer_for(domain), self.clock_skew)?;
        Ok(VerifiedIdentity::new(claims))
    }
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}

impl Default for TokenValidator {
    fn default() -> Self {
        Self::new(Arc::new(KeyStore::default()), DEFAULT_CLOCK_SKEW)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// The value is split on single spaces and must yield exactly two parts, the
/// first literally `Bearer`.
///
/// # Errors
///
/// - `MissingAuthorizationHeader` - header absent or empty
/// - `InvalidAuthorizationHeader` - any other shape
pub fn extract_bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let value = authorization
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingAuthorizationHeader)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(AuthError::InvalidAuthorizationHeader),
    }
}

/// Verify signature and claims, returning the full claim set.
///
/// The description of a failure is the verification library's own message.
fn verify_token(
    token: &str,
    key: &DecodingKey,
    audience: &str,
    issuer: &str,
    clock_skew: Duration,
) -> Result<Map<String, Value>, AuthError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = clock_skew.as_secs();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.set_audience(&[audience]);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(REQUIRED_CLAIMS);

    let token_data = decode::<Map<String, Value>>(token, key, &validation).map_err(|e| {
        tracing::debug!(target: "guard.auth.validator", error = %e, "Token verification failed");
        AuthError::Verification(e.to_string())
    })?;

    Ok(token_data.claims)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unexpected error during token validation".to_string()
    }
}
