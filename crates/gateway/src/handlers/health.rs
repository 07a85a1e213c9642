//! Health check handler.

use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// `GET /healthz` — pings the database so a load balancer's health check
/// reflects real readiness, not just process liveness.
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.repo.ping().await {
        Ok(()) => "up".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database ping failed");
            "down".to_string()
        }
    };

    Json(HealthResponse {
        status: if database == "up" { "healthy" } else { "degraded" }.to_string(),
        database,
    })
}
