//! Token Guard
//!
//! Validates RS256 bearer tokens against the signing keys an identity
//! provider publishes, and puts handlers behind that validation.
//!
//! # Architecture
//!
//! ```text
//! middleware/*.rs -> auth/validator.rs -> auth/key_store.rs -> auth/jwks.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Validation pipeline, key store and signing-key fetchers
//! - `config` - Service configuration from environment and secrets
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP-style and callback-style handler adapters
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;

pub use auth::{KeyStore, TokenValidator, VerifiedIdentity};
pub use config::ValidationConfig;
pub use errors::{ErrorCode, ValidationError};
pub use observability::metrics::init_metrics_recorder;
