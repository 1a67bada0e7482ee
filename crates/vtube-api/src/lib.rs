//! Axum HTTP API server.
//!
//! This crate provides:
//! - The Mux webhook dispatcher
//! - Generation job trigger endpoints
//! - Health/readiness probes and Prometheus metrics
//! - Request middleware (ids, logging, security headers, rate limiting)

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
