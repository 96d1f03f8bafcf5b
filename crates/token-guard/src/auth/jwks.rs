//! Signing-key fetcher for one issuer's published key-set.
//!
//! A [`SigningKeyFetcher`] downloads `/.well-known/jwks.json` from an
//! issuer and caches the RSA verification keys it contains.
//!
//! # Caching
//!
//! - Keys are served from cache until `cache_ttl` expires
//! - Concurrent cache misses share one refresh (waiters re-check the cache)
//! - An unknown `kid` refetches only if the last fetch is older than
//!   `min_refresh_interval`, so rotated keys are picked up without letting
//!   random kids hammer the endpoint

use crate::observability::metrics;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL (10 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default HTTP timeout for a key-set request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum time between refetches triggered by an unknown `kid`.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum accepted key-set response body (512KB).
const MAX_JWKS_RESPONSE_BYTES: usize = 512 * 1024;

/// Key-set retrieval errors.
///
/// The messages are surfaced to clients verbatim as the 401 description.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyFetchError {
    #[error("{0}")]
    Transport(String),

    #[error("Http Error {0}")]
    HttpStatus(u16),

    #[error("Invalid JWKS response: {0}")]
    InvalidResponse(String),

    #[error("The JWKS endpoint did not contain any keys")]
    NoKeys,

    #[error("The JWKS endpoint did not contain any signing keys")]
    NoSigningKeys,

    #[error("Unable to find a signing key that matches '{0}'")]
    KeyNotFound(String),
}

/// JSON Web Key from a JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for usable keys).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm the key is intended for.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" for signing keys).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

impl Jwk {
    /// RSA signing key with a `kid` and usable components.
    fn signing_components(&self) -> Option<(&str, &str, &str)> {
        if self.kty != "RSA" {
            return None;
        }
        if self.key_use.as_deref().is_some_and(|u| u != "sig") {
            return None;
        }
        let kid = self.kid.as_deref().filter(|k| !k.is_empty())?;
        Some((kid, self.n.as_deref()?, self.e.as_deref()?))
    }
}

/// JWKS response document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

/// Fetcher tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherOptions {
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
    pub min_refresh_interval: Duration,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        }
    }
}

/// Cached key-set with fetch time.
struct CachedJwks {
    /// Map of key ID to verification key.
    keys: HashMap<String, DecodingKey>,

    fetched_at: Instant,
}

/// Cache lookup outcome.
enum Lookup {
    Hit(DecodingKey),
    Miss(KeyFetchError),
    Refresh,
}

/// Resolves key IDs to RSA verification keys for one issuer.
///
/// Long-lived and shared: one instance per issuer domain, owned by
/// [`crate::auth::KeyStore`].
pub struct SigningKeyFetcher {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached JWKS data.
    cache: RwLock<Option<CachedJwks>>,

    /// Serializes refreshes so concurrent misses issue one request.
    refresh_lock: Mutex<()>,

    options: FetcherOptions,
}

impl SigningKeyFetcher {
    /// Create a fetcher for `jwks_url`.
    pub fn new(jwks_url: String, options: FetcherOptions) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(options.http_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "guard.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            options,
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Resolve a key ID to its verification key.
    ///
    /// Serves from cache when possible, otherwise fetches the key-set.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyFetchError`] if the key-set cannot be fetched or
    /// parsed, or does not contain `kid`.
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    pub async fn resolve_key(&self, kid: &str) -> Result<DecodingKey, KeyFetchError> {
        match self.lookup(kid).await {
            Lookup::Hit(key) => return Ok(key),
            Lookup::Miss(err) => return Err(err),
            Lookup::Refresh => {}
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited for the lock
        match self.lookup(kid).await {
            Lookup::Hit(key) => return Ok(key),
            Lookup::Miss(err) => return Err(err),
            Lookup::Refresh => {}
        }

        self.refresh_cache(kid).await?.ok_or_else(|| {
            tracing::warn!(target: "guard.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
            KeyFetchError::KeyNotFound(kid.to_string())
        })
    }

    async fn lookup(&self, kid: &str) -> Lookup {
        let cache = self.cache.read().await;
        let Some(cached) = cache.as_ref() else {
            return Lookup::Refresh;
        };

        let age = cached.fetched_at.elapsed();
        if age >= self.options.cache_ttl {
            return Lookup::Refresh;
        }

        match cached.keys.get(kid) {
            Some(key) => {
                tracing::debug!(target: "guard.auth.jwks", kid = %kid, "JWKS cache hit");
                Lookup::Hit(key.clone())
            }
            None if age < self.options.min_refresh_interval => {
                tracing::debug!(target: "guard.auth.jwks", kid = %kid, "Key not found in recently fetched JWKS");
                Lookup::Miss(KeyFetchError::KeyNotFound(kid.to_string()))
            }
            None => Lookup::Refresh,
        }
    }

    /// Refresh the JWKS cache by fetching from the issuer.
    ///
    /// Returns the key for `kid` from the new key-set, if present.
    #[instrument(skip(self))]
    async fn refresh_cache(&self, kid: &str) -> Result<Option<DecodingKey>, KeyFetchError> {
        let result = self.fetch_keys().await;
        metrics::record_jwks_refresh(if result.is_ok() { "success" } else { "error" });
        let keys = result?;

        tracing::info!(
            target: "guard.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let key = keys.get(kid).cloned();

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            fetched_at: Instant::now(),
        });

        Ok(key)
    }

    async fn fetch_keys(&self) -> Result<HashMap<String, DecodingKey>, KeyFetchError> {
        tracing::debug!(target: "guard.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "guard.auth.jwks", error = %e, "Failed to fetch JWKS");
                KeyFetchError::Transport(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "guard.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(KeyFetchError::HttpStatus(response.status().as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|len| len > MAX_JWKS_RESPONSE_BYTES as u64)
        {
            return Err(KeyFetchError::InvalidResponse(
                "response exceeds maximum size".to_string(),
            ));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "guard.auth.jwks", error = %e, "Failed to read JWKS body");
            KeyFetchError::Transport(e.to_string())
        })?;

        if body.len() > MAX_JWKS_RESPONSE_BYTES {
            return Err(KeyFetchError::InvalidResponse(
                "response exceeds maximum size".to_string(),
            ));
        }

        let jwks: JwksResponse = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(target: "guard.auth.jwks", error = %e, "Failed to parse JWKS response");
            KeyFetchError::InvalidResponse(e.to_string())
        })?;

        parse_signing_keys(jwks)
    }
}

/// Build the kid → key map from a key-set, keeping only RSA signing keys.
fn parse_signing_keys(jwks: JwksResponse) -> Result<HashMap<String, DecodingKey>, KeyFetchError> {
    if jwks.keys.is_empty() {
        return Err(KeyFetchError::NoKeys);
    }

    let mut keys = HashMap::new();
    for jwk in &jwks.keys {
        let Some((kid, n, e)) = jwk.signing_components() else {
            tracing::debug!(target: "guard.auth.jwks", kty = %jwk.kty, "Skipping non-signing JWK");
            continue;
        };

        match DecodingKey::from_rsa_components(n, e) {
            Ok(key) => {
                keys.insert(kid.to_string(), key);
            }
            Err(err) => {
                tracing::warn!(target: "guard.auth.jwks", kid = %kid, error = %err, "Skipping JWK with invalid RSA components");
            }
        }
    }

    if keys.is_empty() {
        return Err(KeyFetchError::NoSigningKeys);
    }

    Ok(keys)
}
