//! Builder patterns for test token construction.

use crate::crypto_fixtures::TestRsaKey;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Audience used by tests that do not care about the exact value.
pub const TEST_AUDIENCE: &str = "https://api.token-guard.test";

/// Builder for test JWT claims and signed tokens.
///
/// Defaults produce claims that pass validation for `domain` and
/// `audience`: `iss` is `https://{domain}/`, `exp` is one hour out.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new("tenant.example.com", TEST_AUDIENCE)
///     .for_user("alice")
///     .with_scope("read:messages")
///     .sign_rs256(&PRIMARY_KEY, "key-1");
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a builder with valid defaults for the given issuer and audience.
    pub fn new(domain: &str, audience: &str) -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(format!("https://{domain}/")));
        claims.insert("aud".to_string(), json!(audience));
        claims.insert("sub".to_string(), json!("test-subject"));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims }
    }

    /// Set the subject.
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set the scope (space-separated).
    pub fn with_scope(self, scope: &str) -> Self {
        self.with_claim("scope", json!(scope))
    }

    /// Override the issuer claim verbatim.
    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    /// Override the audience claim (string or array).
    pub fn with_audience(self, audience: Value) -> Self {
        self.with_claim("aud", audience)
    }

    /// Set expiration in seconds from now (negative for expired tokens).
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("exp", json!(exp))
    }

    /// Set not-before in seconds from now.
    pub fn not_before_in(self, seconds: i64) -> Self {
        let nbf = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("nbf", json!(nbf))
    }

    /// Set any claim.
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim.
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Claims as they will be signed.
    pub fn claims(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Build the claims as a JSON value.
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }

    /// Sign with RS256 using `key`, declaring `kid` in the header.
    pub fn sign_rs256(self, key: &TestRsaKey, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(&header, &self.claims, &key.encoding_key()).expect("RS256 signing should succeed")
    }

    /// Sign with HS256 using a shared secret, declaring `kid` in the header.
    pub fn sign_hs256(self, secret: &[u8], kid: &str) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());
        encode(&header, &self.claims, &EncodingKey::from_secret(secret))
            .expect("HS256 signing should succeed")
    }

    /// Encode with an arbitrary header and a fake signature.
    ///
    /// For exercising checks that run before signature verification.
    pub fn with_raw_header(self, header: &Value) -> String {
        format!(
            "{}.{}.c2lnbmF0dXJl",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(Value::Object(self.claims).to_string())
        )
    }
}

/// `Authorization` header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_fixtures::PRIMARY_KEY;

    #[test]
    fn test_builder_defaults() {
        let claims = TestTokenBuilder::new("tenant.example.com", TEST_AUDIENCE).build();

        assert_eq!(claims["iss"], "https://tenant.example.com/");
        assert_eq!(claims["aud"], TEST_AUDIENCE);
        assert_eq!(claims["sub"], "test-subject");
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_builder_overrides() {
        let claims = TestTokenBuilder::new("tenant.example.com", TEST_AUDIENCE)
            .for_user("alice")
            .with_scope("read write")
            .without_claim("iat")
            .build();

        assert_eq!(claims["sub"], "alice");
        assert_eq!(claims["scope"], "read write");
        assert!(claims.get("iat").is_none());
    }

    #[test]
    fn test_sign_rs256_sets_header() {
        let token = TestTokenBuilder::new("tenant.example.com", TEST_AUDIENCE)
            .sign_rs256(&PRIMARY_KEY, "key-1");

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("key-1"));
    }

    #[test]
    fn test_sign_hs256_sets_header() {
        let token = TestTokenBuilder::new("tenant.example.com", TEST_AUDIENCE)
            .sign_hs256(b"shared-secret", "key-1");

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
    }

    #[test]
    fn test_bearer() {
        assert_eq!(bearer("abc"), "Bearer abc");
    }
}
