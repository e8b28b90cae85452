//! Health check endpoint.
//!
//! Used by load balancers and uptime monitors; needs no token.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServingStatus {
    Serving,
    NotServing,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    pub status: ServingStatus,
    pub message: String,
    pub environment: String,
    pub server_time: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(check))
}

/// GET /api/health
async fn check(State(state): State<AppState>) -> (StatusCode, Json<HealthCheckResponse>) {
    let (code, status, message) = if state.db.health_check().await {
        (StatusCode::OK, ServingStatus::Serving, "All systems operational")
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            ServingStatus::NotServing,
            "Database unavailable",
        )
    };

    (
        code,
        Json(HealthCheckResponse {
            status,
            message: message.to_string(),
            environment: state.config.environment.clone(),
            server_time: Utc::now().to_rfc3339(),
        }),
    )
}
