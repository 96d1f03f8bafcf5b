//! # Token Guard Test Utilities
//!
//! This crate provides:
//! - Fixed RSA keypairs and their JWK forms (`crypto_fixtures`)
//! - Claim and token builders (`TestTokenBuilder`)
//! - A mocked issuer serving `/.well-known/jwks.json` (`MockIssuer`)
//! - Server test harness (`TestGuardServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use guard_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let issuer = MockIssuer::start().await;
//!     issuer.serve_keys(&[PRIMARY_KEY.jwk("key-1")], 1).await;
//!
//!     let token = TestTokenBuilder::new(&issuer.domain(), TEST_AUDIENCE)
//!         .for_user("alice")
//!         .sign_rs256(&PRIMARY_KEY, "key-1");
//! }
//! ```

pub mod crypto_fixtures;
pub mod mock_jwks;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use mock_jwks::*;
pub use server_harness::*;
pub use token_builders::*;
