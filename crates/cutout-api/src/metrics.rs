//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "cutout_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "cutout_http_request_duration_seconds";

    // Gate metrics
    pub const REMOVALS_TOTAL: &str = "cutout_removals_total";
    pub const CREDIT_DENIALS_TOTAL: &str = "cutout_credit_denials_total";
    pub const REFUNDS_TOTAL: &str = "cutout_refunds_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "cutout_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a completed background removal.
pub fn record_removal() {
    counter!(names::REMOVALS_TOTAL).increment(1);
}

/// Record a request denied for lack of credit.
pub fn record_credit_denial() {
    counter!(names::CREDIT_DENIALS_TOTAL).increment(1);
}

/// Record a compensating refund attempt.
pub fn record_refund(success: bool) {
    let result = if success { "ok" } else { "failed" };
    counter!(names::REFUNDS_TOTAL, &[("result", result.to_string())]).increment(1);
}

/// Record a rate limit hit.
pub fn record_rate_limit_hit(path: &str) {
    counter!(names::RATE_LIMIT_HITS_TOTAL, &[("path", path.to_string())]).increment(1);
}

/// Middleware that records request count and duration.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
