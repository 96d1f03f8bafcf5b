//! Bearer token authentication.
//!
//! - `jwks` - per-issuer signing-key fetcher with caching
//! - `key_store` - domain → fetcher registry
//! - `validator` - the validation pipeline
//! - `identity` - verified claim set
//! - `headers` - `Authorization` header access

pub mod headers;
pub mod identity;
pub mod jwks;
pub mod key_store;
pub mod validator;

pub use headers::HeaderSource;
pub use identity::VerifiedIdentity;
pub use jwks::{FetcherOptions, KeyFetchError, SigningKeyFetcher};
pub use key_store::KeyStore;
pub use validator::TokenValidator;
