//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request in a span carrying a fresh request id, records
//! Prometheus metrics, and logs completion.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::metrics::metrics;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Collapse paths into a small fixed label set for metrics.
///
/// The options endpoint accepts any path ending in `/next-options`, so raw
/// paths would explode label cardinality.
pub fn route_label(path: &str) -> &'static str {
    match path {
        "/health/ping" => "/health/ping",
        "/health/live" => "/health/live",
        "/health/ready" => "/health/ready",
        "/metrics" => "/metrics",
        p if p.ends_with("/next-options") => "/next-options",
        _ => "other",
    }
}

/// Observability middleware for Axum.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = route_label(&path);
    let request_id = Uuid::now_v7();

    let span = info_span!(
        "http_request",
        request_id = %request_id,
        http.method = %method,
        http.target = %path,
        http.route = route,
    );

    let mut response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Some(metrics) = metrics() {
        metrics.record_http_request(method.as_str(), route, status.as_u16(), duration.as_secs_f64());
    }

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
