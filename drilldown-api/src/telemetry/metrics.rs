//! Prometheus Metrics Definitions
//!
//! Defines all DRILLDOWN metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 20s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 20.0,
];

/// Upstream call latency buckets (seconds); model calls take seconds.
const UPSTREAM_LATENCY_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 12.0, 16.0, 20.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<DrilldownMetrics>> = Lazy::new(DrilldownMetrics::new);

/// Registered metrics, if registration succeeded.
pub fn metrics() -> Option<&'static DrilldownMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all DRILLDOWN metrics.
#[derive(Clone)]
pub struct DrilldownMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Resolution counter - labels: outcome (cache_hit, joined, llm, stub)
    pub resolutions_total: CounterVec,

    /// Upstream failure counter - labels: source, kind
    pub upstream_failures_total: CounterVec,

    /// Upstream call duration histogram - labels: source
    pub upstream_duration_seconds: HistogramVec,

    /// Entries currently cached
    pub cache_entries: Gauge,
}

impl DrilldownMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        let failed = |name: &str, e: prometheus::Error| {
            ApiError::internal_error(format!("Failed to register {}: {}", name, e))
        };

        Ok(Self {
            http_requests_total: register_counter_vec!(
                "drilldown_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| failed("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "drilldown_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| failed("http_request_duration_seconds", e))?,

            resolutions_total: register_counter_vec!(
                "drilldown_resolutions_total",
                "Resolved navigation requests by outcome",
                &["outcome"]
            )
            .map_err(|e| failed("resolutions_total", e))?,

            upstream_failures_total: register_counter_vec!(
                "drilldown_upstream_failures_total",
                "Upstream failures absorbed into stub results",
                &["source", "kind"]
            )
            .map_err(|e| failed("upstream_failures_total", e))?,

            upstream_duration_seconds: register_histogram_vec!(
                "drilldown_upstream_duration_seconds",
                "Upstream fetch duration in seconds",
                &["source"],
                UPSTREAM_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| failed("upstream_duration_seconds", e))?,

            cache_entries: register_gauge!(
                "drilldown_cache_entries",
                "Current number of cached results"
            )
            .map_err(|e| failed("cache_entries", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record how a request was answered.
    pub fn record_resolution(&self, outcome: &str) {
        self.resolutions_total.with_label_values(&[outcome]).inc();
    }

    /// Record an upstream call; `failure` is the error kind label, if any.
    pub fn record_upstream(&self, source: &str, failure: Option<&str>, duration_secs: f64) {
        self.upstream_duration_seconds
            .with_label_values(&[source])
            .observe(duration_secs);
        if let Some(kind) = failure {
            self.upstream_failures_total
                .with_label_values(&[source, kind])
                .inc();
        }
    }

    pub fn set_cache_entries(&self, count: usize) {
        self.cache_entries.set(count as f64);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
