//! Token Guard configuration.
//!
//! Two layers:
//! - [`ValidationConfig`] holds the per-request validation inputs (issuer
//!   domain and audience) resolved from the trusted secrets map. Missing
//!   values are NOT a load error; the pipeline reports them per request.
//! - [`Config`] is the service configuration loaded from environment
//!   variables with defaults and range checks.

use crate::auth::jwks::FetcherOptions;
use crate::errors::AuthError;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Secret holding the identity provider's domain.
pub const DOMAIN_SECRET: &str = "AUTH0_DOMAIN";

/// Secret holding the expected token audience.
pub const AUDIENCE_SECRET: &str = "AUTH0_AUDIENCE";

/// Default JWKS cache TTL in seconds (10 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 600;

/// Upper bound for the JWKS cache TTL (1 day).
pub const MAX_JWKS_CACHE_TTL_SECONDS: u64 = 86_400;

/// Default JWKS HTTP timeout in seconds.
pub const DEFAULT_JWKS_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the JWKS HTTP timeout.
pub const MAX_JWKS_HTTP_TIMEOUT_SECONDS: u64 = 60;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Issuer domain and audience a token must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Identity provider domain, e.g. `tenant.example.com`.
    pub issuer_domain: Option<String>,

    /// Expected `aud` claim.
    pub audience: Option<String>,
}

impl ValidationConfig {
    pub fn new(issuer_domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer_domain: Some(issuer_domain.into()),
            audience: Some(audience.into()),
        }
    }

    /// Read `AUTH0_DOMAIN` and `AUTH0_AUDIENCE` from a secrets map.
    pub fn from_secrets(secrets: &HashMap<String, String>) -> Self {
        Self {
            issuer_domain: secrets.get(DOMAIN_SECRET).cloned(),
            audience: secrets.get(AUDIENCE_SECRET).cloned(),
        }
    }

    /// Returns `(domain, audience)` or the configuration error for the
    /// first missing value. Empty strings count as missing.
    pub(crate) fn require(&self) -> Result<(&str, &str), AuthError> {
        let domain = non_empty(self.issuer_domain.as_deref()).ok_or(AuthError::MissingDomain)?;
        let audience = non_empty(self.audience.as_deref()).ok_or(AuthError::MissingAudience)?;
        Ok((domain, audience))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Expected `iss` claim for tokens minted by `domain`.
pub fn issuer_for(domain: &str) -> String {
    format!("https://{domain}/")
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Service configuration.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Issuer domain and audience for protected routes.
    pub validation: ValidationConfig,

    /// How long a fetched key-set is served from cache.
    pub jwks_cache_ttl_seconds: u64,

    /// Timeout for a single key-set HTTP request.
    pub jwks_http_timeout_seconds: u64,

    /// Leeway in seconds applied to `exp` and `nbf`.
    pub jwt_clock_skew_seconds: u64,

    /// Log output format.
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidJwksCacheTtl(String),

    #[error("Invalid JWKS HTTP timeout configuration: {0}")]
    InvalidJwksHttpTimeout(String),

    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let validation = ValidationConfig::from_secrets(vars);

        let jwt_clock_skew_seconds = parse_bounded(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_CLOCK_SKEW.as_secs(),
            MAX_CLOCK_SKEW.as_secs(),
        )
        .map_err(ConfigError::InvalidJwtClockSkew)?;

        let jwks_cache_ttl_seconds = parse_bounded(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
            MAX_JWKS_CACHE_TTL_SECONDS,
        )
        .map_err(ConfigError::InvalidJwksCacheTtl)?;

        let jwks_http_timeout_seconds = parse_bounded(
            vars,
            "JWKS_HTTP_TIMEOUT_SECONDS",
            DEFAULT_JWKS_HTTP_TIMEOUT_SECONDS,
            MAX_JWKS_HTTP_TIMEOUT_SECONDS,
        )
        .map_err(ConfigError::InvalidJwksHttpTimeout)?;

        let log_format = match vars.get("LOG_FORMAT").map(String::as_str) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidLogFormat(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{other}'"
                )))
            }
        };

        Ok(Config {
            bind_address,
            validation,
            jwks_cache_ttl_seconds,
            jwks_http_timeout_seconds,
            jwt_clock_skew_seconds,
            log_format,
        })
    }

    /// Key-set fetcher settings derived from this configuration.
    pub fn fetcher_options(&self) -> FetcherOptions {
        FetcherOptions {
            cache_ttl: Duration::from_secs(self.jwks_cache_ttl_seconds),
            http_timeout: Duration::from_secs(self.jwks_http_timeout_seconds),
            ..FetcherOptions::default()
        }
    }

    pub fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.jwt_clock_skew_seconds)
    }
}

/// Parse an optional positive integer no larger than `max`.
fn parse_bounded(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    max: u64,
) -> Result<u64, String> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str
        .parse()
        .map_err(|e| format!("{name} must be a valid positive integer, got '{value_str}': {e}"))?;

    if value == 0 {
        return Err(format!("{name} must be greater than 0"));
    }

    if value > max {
        return Err(format!(
            "{name} must not exceed {max} seconds, got {value}"
        ));
    }

    Ok(value)
}
