//! Authentication middleware for protected routes.
//!
//! Validates the bearer token in the `Authorization` header and injects the
//! [`VerifiedIdentity`] into request extensions.

use crate::auth::{TokenValidator, VerifiedIdentity};
use crate::config::ValidationConfig;
use crate::errors::ValidationError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token validator with its key store.
    pub validator: Arc<TokenValidator>,

    /// Issuer domain and audience tokens must match.
    pub config: Arc<ValidationConfig>,
}

/// Authentication middleware that validates bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - On failure, responds with the error's status and its JSON body; 401s
///   carry a `WWW-Authenticate` header
/// - On success, continues to the next handler with the identity in
///   extensions (extract it with `Extension<VerifiedIdentity>`)
#[instrument(skip_all, name = "guard.middleware.auth")]
pub async fn require_auth(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ValidationError> {
    let identity = state
        .validator
        .validate(state.config.as_ref(), req.headers())
        .await?;

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Extension trait for reading the verified identity from a request.
pub trait IdentityExt {
    /// Returns `None` if auth middleware was not applied to this request.
    fn identity(&self) -> Option<&VerifiedIdentity>;
}

impl<B> IdentityExt for axum::http::Request<B> {
    fn identity(&self) -> Option<&VerifiedIdentity> {
        self.extensions().get::<VerifiedIdentity>()
    }
}
