//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

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
    pub const HTTP_REQUESTS_TOTAL: &str = "vtube_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vtube_http_request_duration_seconds";

    // Webhook metrics
    pub const WEBHOOK_EVENTS_TOTAL: &str = "vtube_webhook_events_total";

    // Queue metrics
    pub const JOBS_ENQUEUED_TOTAL: &str = "vtube_jobs_enqueued_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "vtube_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a processed webhook event by type and outcome.
pub fn record_webhook_event(event_kind: &str, outcome: &str) {
    counter!(
        names::WEBHOOK_EVENTS_TOTAL,
        "type" => event_kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record an enqueued generation job.
pub fn record_job_enqueued(job_kind: &str) {
    counter!(
        names::JOBS_ENQUEUED_TOTAL,
        "kind" => job_kind.to_string()
    )
    .increment(1);
}

/// Record a rate-limited request.
pub fn record_rate_limit_hit() {
    counter!(names::RATE_LIMIT_HITS_TOTAL).increment(1);
}

/// Collapse id path segments so metrics cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (i, segment) in path.split('/').enumerate() {
        // /api/videos/{id}/... is the only parameterized surface
        if i > 0 && parts.last().map(String::as_str) == Some("videos") && !segment.is_empty() {
            parts.push(":video_id".to_string());
        } else {
            parts.push(segment.to_string());
        }
    }
    parts.join("/")
}

/// Middleware recording request counts and latencies.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_collapses_video_ids() {
        assert_eq!(
            sanitize_path("/api/videos/vid-1234/thumbnail"),
            "/api/videos/:video_id/thumbnail"
        );
        assert_eq!(sanitize_path("/api/webhooks/mux"), "/api/webhooks/mux");
        assert_eq!(sanitize_path("/health"), "/health");
    }
}
