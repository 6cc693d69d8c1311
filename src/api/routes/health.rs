//! Health check endpoint

use axum::{Json, extract::State};
use chrono::Utc;

use crate::api::{error::ApiResult, state::ApiState, types::HealthResponse};

/// GET /api/v1/health
///
/// Returns 503 if the registry actor stopped answering
pub async fn health_check(State(state): State<ApiState>) -> ApiResult<Json<HealthResponse>> {
    let status = state.registry.status().await?;
    let now = Utc::now();

    Ok(Json(HealthResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        status: "running".to_string(),
        nodes_count: status.nodes,
        connections_count: status.connections,
        max_connections: status.max_connections,
        last_gc: status.last_sweep,
        uptime_seconds: (now - state.started_at).num_seconds(),
        timestamp: now.to_rfc3339(),
    }))
}
