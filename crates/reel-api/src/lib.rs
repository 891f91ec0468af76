//! Axum HTTP API server.
//!
//! This crate provides:
//! - The REST surface for uploads, editing, publishing, clips and imports
//! - Readiness checks and Prometheus metrics
//! - Startup wiring for the store, services and the ingest worker

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

pub use auth::AuthUser;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
