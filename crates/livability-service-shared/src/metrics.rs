//! Prometheus metrics for the livability services.
//!
//! ```no_run
//! use livability_service_shared::metrics::{MetricsConfig, init_metrics, metrics_handler};
//! use axum::{Router, routing::get};
//!
//! init_metrics(&MetricsConfig::default()).expect("failed to initialize metrics");
//! let app: Router = Router::new().route("/metrics", get(metrics_handler));
//! ```

use livability_lib::CacheStats;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Configuration for the metrics system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Path for the metrics endpoint (e.g., "/metrics").
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// - `METRICS_ENABLED`: "true" or "false" (default: true)
    /// - `METRICS_PATH`: Path for metrics endpoint (default: "/metrics")
    pub fn from_env() -> Self {
        let enabled = std::env::var("METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let path = std::env::var("METRICS_PATH").unwrap_or_else(|_| "/metrics".to_string());

        Self { enabled, path }
    }
}

/// Install the Prometheus recorder. Subsequent calls fail with
/// [`MetricsError::AlreadyInitialized`].
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    Ok(())
}

/// Axum handler for the metrics endpoint (Prometheus exposition format).
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# Metrics not initialized\n".to_string())
}

/// Errors that can occur during metrics initialization.
#[derive(Debug, Clone)]
pub enum MetricsError {
    Disabled,
    AlreadyInitialized,
    InstallFailed(String),
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::Disabled => write!(f, "metrics are disabled"),
            MetricsError::AlreadyInitialized => write!(f, "metrics recorder already initialized"),
            MetricsError::InstallFailed(e) => {
                write!(f, "failed to install metrics recorder: {}", e)
            }
        }
    }
}

impl std::error::Error for MetricsError {}

// =============================================================================
// Business Metrics Helpers
// =============================================================================

/// Increment `livability_places_queried_total` and record how many places
/// were returned.
pub fn record_places_queried(mode: &str, returned: usize) {
    metrics::counter!(
        "livability_places_queried_total",
        "mode" => mode.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "livability_places_returned",
        "mode" => mode.to_string()
    )
    .record(returned as f64);
}

/// Increment `livability_query_failures_total`.
///
/// `reason` is one of "validation_error", "invalid_mode", "data_unavailable"
/// or "internal_error".
pub fn record_query_failed(reason: &str) {
    metrics::counter!(
        "livability_query_failures_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record the length of a returned route in meters.
pub fn record_route_length(length_m: f64, mode: &str) {
    metrics::histogram!(
        "livability_route_length_meters",
        "mode" => mode.to_string()
    )
    .record(length_m);
}

/// Publish path cache counters as gauges.
pub fn record_cache_stats(stats: &CacheStats) {
    metrics::gauge!("livability_path_cache_entries").set(stats.entries as f64);
    metrics::gauge!("livability_path_cache_hits").set(stats.hits as f64);
    metrics::gauge!("livability_path_cache_misses").set(stats.misses as f64);
    metrics::gauge!("livability_path_cache_evictions").set(stats.evictions as f64);
}

/// Increment `livability_reloads_total` by outcome ("ok" or "failed").
pub fn record_reload(outcome: &str) {
    metrics::counter!(
        "livability_reloads_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_config_default() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.path, "/metrics");
    }

    #[test]
    fn test_metrics_handler_without_recorder() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let output = rt.block_on(async { metrics_handler().await });
        assert!(output.contains('#') || output.is_empty());
    }

    #[test]
    fn test_business_metrics_do_not_panic() {
        record_places_queried("all", 5);
        record_query_failed("validation_error");
        record_route_length(1234.5, "walk");
        record_cache_stats(&CacheStats::default());
        record_reload("ok");
    }

    #[test]
    fn test_metrics_error_display() {
        assert_eq!(MetricsError::Disabled.to_string(), "metrics are disabled");
        assert!(MetricsError::InstallFailed("boom".to_string())
            .to_string()
            .contains("boom"));
    }
}
