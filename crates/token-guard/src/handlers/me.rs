//! Current identity handler.

use crate::auth::VerifiedIdentity;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /v1/me
///
/// Returns the verified claim set unchanged. Requires the auth middleware.
#[instrument(skip_all, name = "guard.handlers.me")]
pub async fn get_me(Extension(identity): Extension<VerifiedIdentity>) -> Json<VerifiedIdentity> {
    tracing::debug!(target: "guard.handlers.me", "Returning verified claims");
    Json(identity)
}
