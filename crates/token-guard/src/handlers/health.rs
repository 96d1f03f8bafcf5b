//! Health check handler.

use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::instrument;

/// Liveness response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests.
    pub status: &'static str,

    /// Number of issuers with a cached key fetcher.
    pub issuers: usize,
}

/// Handler for GET /health
///
/// ```json
/// { "status": "healthy", "issuers": 1 }
/// ```
#[instrument(skip_all, name = "guard.health.check")]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        issuers: state.auth.validator.key_store().fetcher_count().await,
    })
}
