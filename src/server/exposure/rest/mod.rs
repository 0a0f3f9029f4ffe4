//! REST exposure
//!
//! The catalog itself is only served over GraphQL; REST carries the
//! liveness routes used by load balancers and orchestrators.

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

/// Service name reported by the health check
pub const SERVICE_NAME: &str = "pontoon-api";

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router with health check routes
    pub fn build_router() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": SERVICE_NAME
        }))
    }
}
