//! Prometheus metrics for the gateway.
//!
//! - [`MetricsConfig`]: Configuration for the metrics system
//! - [`init_metrics`]: Initialize the Prometheus metrics recorder
//! - [`metrics_handler`]: Axum handler for `/metrics`
//! - Search metric helpers
//!
//! HTTP metrics are recorded by the access log layer.
//!
//! # Example
//!
//! ```no_run
//! use tsubasa_service_shared::metrics::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::from_env()).expect("failed to initialize metrics");
//! ```

use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use tsubasa_lib::{Error as LibError, MatchType};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl MetricsConfig {
    /// `METRICS_ENABLED`: "true" or "false" (default: true)
    pub fn from_env() -> Self {
        let enabled = std::env::var("METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self { enabled }
    }
}

/// Install the Prometheus recorder.
///
/// Must be called once before any metric is recorded; later calls fail with
/// [`MetricsError::AlreadyInitialized`].
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }

    if PROMETHEUS_HANDLE.get().is_some() {
        return Err(MetricsError::AlreadyInitialized);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    Ok(())
}

/// Returns `None` if [`init_metrics`] has not been called.
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Axum handler for the `/metrics` endpoint, in Prometheus exposition format.
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
// Search Metrics Helpers
// =============================================================================

/// Label value for indexes outside the configured set.
pub const OTHER_INDEX_LABEL: &str = "other";

/// Bounded `index` label: the index itself when it is one of `known`,
/// otherwise [`OTHER_INDEX_LABEL`].
pub fn index_label<'a>(index: &'a str, known: &[String]) -> &'a str {
    if known.iter().any(|k| k == index) {
        index
    } else {
        OTHER_INDEX_LABEL
    }
}

/// Increment `tsubasa_searches_total` for a successful search.
///
/// `index` should come from [`index_label`] since clients choose the path.
pub fn record_search(index: &str, match_type: MatchType) {
    metrics::counter!(
        "tsubasa_searches_total",
        "index" => index.to_string(),
        "match_type" => match_type.to_string()
    )
    .increment(1);
}

/// Increment `tsubasa_search_failures_total`.
///
/// `reason` should come from [`failure_reason`] so the label stays bounded.
pub fn record_search_failed(reason: &'static str) {
    metrics::counter!("tsubasa_search_failures_total", "reason" => reason).increment(1);
}

/// Record the gateway-measured backend round-trip into
/// `tsubasa_backend_latency_seconds`.
pub fn record_backend_latency(latency: Duration) {
    metrics::histogram!("tsubasa_backend_latency_seconds").record(latency.as_secs_f64());
}

/// Bounded label describing why a search failed.
pub fn failure_reason(error: &LibError) -> &'static str {
    match error {
        LibError::InvalidMatchType { .. } => "invalid_match_type",
        LibError::Backend { .. } => "backend_error",
        LibError::Http(e) if e.is_timeout() => "timeout",
        LibError::Http(_) | LibError::Connection { .. } => "transport",
        LibError::Decode(_) => "decode",
        _ => "internal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_config_default() {
        assert!(MetricsConfig::default().enabled);
    }

    #[test]
    fn test_disabled_metrics_refuse_to_install() {
        let err = init_metrics(&MetricsConfig { enabled: false }).unwrap_err();
        assert_eq!(err.to_string(), "metrics are disabled");
    }

    #[test]
    fn test_metrics_handler_returns_prometheus_format() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let output = rt.block_on(metrics_handler());

        assert!(
            output.contains('#') || output.is_empty(),
            "Metrics output should be Prometheus format or indicate not initialized"
        );
    }

    #[test]
    fn test_search_helpers_record_without_recorder() {
        record_search("books", MatchType::Fuzzy);
        record_search_failed("backend_error");
        record_backend_latency(Duration::from_millis(12));
    }

    #[test]
    fn test_unknown_indexes_fold_into_other() {
        let known = vec!["books".to_string(), "authors".to_string()];

        assert_eq!(index_label("books", &known), "books");
        assert_eq!(index_label("authors", &known), "authors");
        assert_eq!(index_label("x1*", &known), OTHER_INDEX_LABEL);
        assert_eq!(index_label("Books", &known), OTHER_INDEX_LABEL);
        assert_eq!(index_label("books", &[]), OTHER_INDEX_LABEL);
    }

    #[test]
    fn test_failure_reasons_are_bounded() {
        let err = LibError::InvalidMatchType {
            match_type: "bogus".to_string(),
        };
        assert_eq!(failure_reason(&err), "invalid_match_type");

        let err = LibError::Backend {
            status: 503,
            kind: "unavailable_shards_exception".to_string(),
            reason: "primary shard is not active".to_string(),
        };
        assert_eq!(failure_reason(&err), "backend_error");

        let err = LibError::Decode(serde_json::from_str::<u8>("x").unwrap_err());
        assert_eq!(failure_reason(&err), "decode");
    }
}
