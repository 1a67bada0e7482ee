//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{health, ready};
use crate::handlers::videos::{generate_description, generate_thumbnail, generate_title};
use crate::handlers::webhooks::mux_webhook;
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Provider webhooks: no rate limiting, the provider bursts redeliveries
    let webhook_routes = Router::new().route("/webhooks/mux", post(mux_webhook));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    // Generation triggers: user-facing, rate limited per IP
    let video_routes = Router::new()
        .route("/videos/:video_id/thumbnail", post(generate_thumbnail))
        .route("/videos/:video_id/title", post(generate_title))
        .route("/videos/:video_id/description", post(generate_description))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let api_routes = Router::new().merge(webhook_routes).merge(video_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
