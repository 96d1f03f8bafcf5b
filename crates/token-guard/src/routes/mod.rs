//! HTTP routes for Token Guard.
//!
//! Defines the Axum router and application state.

use crate::handlers;
use crate::middleware::{require_auth, AuthState};
use axum::{middleware::from_fn_with_state, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Request timeout applied to every route.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Validator and the issuer configuration it enforces.
    pub auth: AuthState,

    /// Handle for rendering Prometheus metrics.
    pub metrics: PrometheusHandle,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (public)
/// - `/metrics` - Prometheus scrape endpoint (public)
/// - `/v1/me` - Verified claims of the caller (bearer token required)
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/v1/me", get(handlers::get_me))
        .layer(from_fn_with_state(state.auth.clone(), require_auth));

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    public_routes
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}
