//! Metrics definitions for Token Guard.
//!
//! All metrics follow Prometheus naming conventions:
//! - `guard_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: 2 values (success, error)
//! - `error_type`: bounded by [`crate::errors::AuthError::error_type`]
//!
//! Token contents, subjects and issuer domains are never used as labels.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Cache hits are sub-millisecond; a key-set fetch adds a network round trip
        .set_buckets_for_metric(
            Matcher::Prefix("guard_token_validation".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
                2.500,
            ],
        )
        .map_err(|e| format!("Failed to set token validation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Validation Metrics
// ============================================================================

/// Record a completed token validation.
///
/// Metric: `guard_token_validations_total`, `guard_token_validation_duration_seconds`
/// Labels: `status`, `error_type`
///
/// `error_type` is `"none"` on success.
pub fn record_token_validation(status: &str, error_type: Option<&str>, duration: Duration) {
    histogram!("guard_token_validation_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("guard_token_validations_total",
        "status" => status.to_string(),
        "error_type" => error_type.unwrap_or("none").to_string()
    )
    .increment(1);
}

// ============================================================================
// Key-Set Metrics
// ============================================================================

/// Record a key-set refresh attempt.
///
/// Metric: `guard_jwks_refresh_total`
/// Labels: `status`
pub fn record_jwks_refresh(status: &str) {
    counter!("guard_jwks_refresh_total", "status" => status.to_string()).increment(1);
}

/// Set the number of issuer fetchers held by the key store.
///
/// Metric: `guard_key_store_fetchers`
pub fn set_key_store_fetchers(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("guard_key_store_fetchers").set(count as f64);
}
