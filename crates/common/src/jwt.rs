//! JWT primitives shared across Token Guard crates.
//!
//! This module provides the parts of JWT handling that do not depend on a
//! signing key:
//! - Size limits for DoS prevention
//! - Clock skew constants for time-based claim validation
//! - Unverified decoding of compact JWTs (header + payload)
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - [`decode_unverified`] does NOT check the signature. Its output may only
//!   be used to pick a verification key and to reject tokens early; the token
//!   MUST still be verified before any claim is trusted.
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::decode_unverified;
//!
//! let decoded = decode_unverified(token)?;
//! if decoded.header.alg.as_deref() != Some("RS256") {
//!     return Err("unsupported algorithm");
//! }
//! let kid = decoded.header.kid().ok_or("missing kid")?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any base64 decoding or
/// cryptographic work.
///
/// - Typical RS256 access tokens are 700-1200 bytes
/// - 8KB allows generous custom claims while bounding allocation
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (60 seconds).
///
/// Applied as leeway when validating `exp` and `nbf`.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Prevents misconfiguration that could weaken security by allowing
/// excessively large clock skew tolerance.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while decoding a JWT without verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("token exceeds maximum allowed size")]
    TokenTooLarge,

    /// Token format is invalid (not a valid compact JWT structure).
    #[error("malformed token: {0}")]
    MalformedToken(&'static str),
}

// =============================================================================
// Decoded Types
// =============================================================================

/// JOSE header fields read before verification.
///
/// Fields that are present but not JSON strings are treated as absent, so a
/// numeric `kid` or an `alg` of `null` fail the same way a missing one does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnverifiedHeader {
    /// Declared signing algorithm.
    pub alg: Option<String>,

    /// Key ID used to select the verification key.
    pub kid: Option<String>,

    /// Declared token type (usually "JWT").
    pub typ: Option<String>,
}

impl UnverifiedHeader {
    fn from_object(object: &Map<String, Value>) -> Self {
        let string_field = |name: &str| {
            object
                .get(name)
                .and_then(Value::as_str)
                .map(ToString::to_string)
        };

        Self {
            alg: string_field("alg"),
            kid: string_field("kid"),
            typ: string_field("typ"),
        }
    }

    /// Key ID, if present and non-empty.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref().filter(|kid| !kid.is_empty())
    }
}

/// A compact JWT split into its decoded header and payload.
///
/// Nothing in here has been verified.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    /// Decoded JOSE header.
    pub header: UnverifiedHeader,

    /// Decoded payload claims.
    pub claims: Map<String, Value>,
}

// =============================================================================
// Functions
// =============================================================================

/// Decode a compact JWT into header and payload without verifying it.
///
/// The token must be three dot-separated segments. The header and payload
/// segments must be base64url (unpadded) JSON objects; the signature segment
/// is not inspected here.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Wrong segment count, bad base64url, or non-object JSON
pub fn decode_unverified(token: &str) -> Result<DecodedToken, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(payload_part), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken(
            "expected three dot-separated segments",
        ));
    };

    let header = decode_segment(header_part, "header")?;
    let claims = decode_segment(payload_part, "payload")?;

    Ok(DecodedToken {
        header: UnverifiedHeader::from_object(&header),
        claims,
    })
}

/// Decode one base64url segment into a JSON object.
fn decode_segment(
    segment: &str,
    name: &'static str,
) -> Result<Map<String, Value>, JwtValidationError> {
    if segment.is_empty() {
        tracing::debug!(target: "common.jwt", segment = name, "Empty JWT segment");
        return Err(JwtValidationError::MalformedToken("empty segment"));
    }

    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to decode JWT base64");
        JwtValidationError::MalformedToken("segment is not base64url")
    })?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => {
            tracing::debug!(target: "common.jwt", segment = name, "JWT segment is not a JSON object");
            Err(JwtValidationError::MalformedToken("segment is not a JSON object"))
        }
        Err(e) => {
            tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to parse JWT JSON");
            Err(JwtValidationError::MalformedToken("segment is not JSON"))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn encode(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json)
    }

    fn token(header: &str, payload: &str) -> String {
        format!("{}.{}.signature", encode(header), encode(payload))
    }

    // -------------------------------------------------------------------------
    // Constants Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_default_clock_skew_within_max() {
        assert!(DEFAULT_CLOCK_SKEW <= MAX_CLOCK_SKEW);
    }

    // -------------------------------------------------------------------------
    // decode_unverified Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_valid_token() {
        let token = token(
            r#"{"alg":"RS256","typ":"JWT","kid":"key-01"}"#,
            r#"{"sub":"user-1","aud":"api"}"#,
        );

        let decoded = decode_unverified(&token).unwrap();

        assert_eq!(decoded.header.alg.as_deref(), Some("RS256"));
        assert_eq!(decoded.header.kid(), Some("key-01"));
        assert_eq!(decoded.header.typ.as_deref(), Some("JWT"));
        assert_eq!(decoded.claims["sub"], "user-1");
    }

    #[test]
    fn test_decode_accepts_empty_signature_segment() {
        let token = format!(
            "{}.{}.",
            encode(r#"{"alg":"none"}"#),
            encode(r#"{"sub":"x"}"#)
        );

        let decoded = decode_unverified(&token).unwrap();
        assert_eq!(decoded.header.alg.as_deref(), Some("none"));
    }

    #[test]
    fn test_decode_wrong_segment_count() {
        for bad in ["", "single", "only.two", "a.b.c.d", "a.b.c.d.e"] {
            assert!(
                matches!(
                    decode_unverified(bad),
                    Err(JwtValidationError::MalformedToken(_))
                ),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_decode_empty_header_segment() {
        let token = format!(".{}.sig", encode(r#"{"sub":"x"}"#));
        assert!(matches!(
            decode_unverified(&token),
            Err(JwtValidationError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_decode_invalid_base64() {
        assert!(matches!(
            decode_unverified("!!!invalid!!!.payload.signature"),
            Err(JwtValidationError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_decode_invalid_json_header() {
        let token = format!("{}.{}.sig", encode("not-json"), encode("{}"));
        assert!(matches!(
            decode_unverified(&token),
            Err(JwtValidationError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_decode_non_object_payload() {
        let token = token(r#"{"alg":"RS256"}"#, "[1,2,3]");
        assert!(matches!(
            decode_unverified(&token),
            Err(JwtValidationError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_decode_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            decode_unverified(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_decode_at_size_limit() {
        let header_b64 = encode(r#"{"alg":"RS256","kid":"key"}"#);
        let payload_b64 = encode(r#"{"sub":"x"}"#);
        let used = header_b64.len() + payload_b64.len() + 2;
        let token = format!(
            "{header_b64}.{payload_b64}.{}",
            "s".repeat(MAX_JWT_SIZE_BYTES - used)
        );

        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);
        assert!(decode_unverified(&token).is_ok());
    }

    #[test]
    fn test_header_non_string_fields_are_absent() {
        let token = token(r#"{"alg":256,"kid":12345}"#, "{}");

        let decoded = decode_unverified(&token).unwrap();
        assert!(decoded.header.alg.is_none());
        assert!(decoded.header.kid().is_none());
    }

    #[test]
    fn test_header_empty_kid_is_absent() {
        let token = token(r#"{"alg":"RS256","kid":""}"#, "{}");

        let decoded = decode_unverified(&token).unwrap();
        assert_eq!(decoded.header.kid.as_deref(), Some(""));
        assert!(decoded.header.kid().is_none());
    }
}
