//! HTTP request handlers.
//!
//! - `health` - liveness probe
//! - `me` - echoes the caller's verified claims
//! - `metrics` - Prometheus scrape endpoint

pub mod health;
pub mod me;
pub mod metrics;

pub use health::health_check;
pub use me::get_me;
pub use self::metrics::metrics_handler;
