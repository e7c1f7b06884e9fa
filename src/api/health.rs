use axum::{response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
}

/// Create health check router (no state, no auth)
pub fn create_health_router() -> Router {
    Router::new().route("/api/v1/health", get(health_check))
}

/// GET /api/v1/health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
