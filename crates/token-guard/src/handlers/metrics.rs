//! Prometheus metrics endpoint handler.
//!
//! Unauthenticated so Prometheus can scrape it. Labels are bounded and carry
//! no token contents.

use crate::routes::AppState;
use axum::{extract::State, response::IntoResponse};

/// Handler for GET /metrics
///
/// Returns Prometheus text format:
/// ```text
/// # TYPE guard_token_validations_total counter
/// guard_token_validations_total{status="success",error_type="none"} 42
/// ```
#[tracing::instrument(skip_all, name = "guard.metrics.scrape")]
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.render()
}
