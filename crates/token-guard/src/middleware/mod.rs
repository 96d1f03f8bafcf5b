//! Handler adapters.
//!
//! Two ways to put a handler behind bearer token validation:
//!
//! - `auth` - axum middleware for HTTP-style handlers
//! - `callback` - wrapper for callback-style handlers that receive an
//!   [`InvocationContext`]

pub mod auth;
pub mod callback;

pub use auth::{require_auth, AuthState, IdentityExt};
pub use callback::{CallbackAdapter, InvocationContext};
