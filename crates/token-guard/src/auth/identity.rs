//! Verified identity.
//!
//! The full claim set of a token whose signature, audience, issuer and
//! lifetime have been checked. The `sub` claim is redacted in Debug output
//! to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Claims of a validated token, exposed unchanged.
///
/// Serializes as the bare claim object.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifiedIdentity {
    claims: Map<String, Value>,
}

impl VerifiedIdentity {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// All claims as decoded from the token payload.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Look up a single claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// The `sub` claim, if it is a string.
    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    /// Space-separated scopes from the `scope` claim.
    pub fn scopes(&self) -> Vec<&str> {
        self.get("scope")
            .and_then(Value::as_str)
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Check if the token has a specific scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().contains(&scope)
    }
}

impl fmt::Debug for VerifiedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.claims {
            if name == "sub" {
                map.entry(name, &"[REDACTED]");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}
