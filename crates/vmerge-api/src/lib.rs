//! Axum HTTP API server.
//!
//! This crate provides:
//! - The multipart merge endpoint
//! - Working root inspection and on-demand purge
//! - Security headers, request ids and request logging
//! - Prometheus metrics

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
