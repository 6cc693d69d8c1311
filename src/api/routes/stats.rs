//! Cluster statistics endpoint

use axum::{Json, extract::State};

use crate::api::{error::ApiResult, state::ApiState};
use crate::store::ClusterStats;

/// GET /api/v1/stats
pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<Json<ClusterStats>> {
    Ok(Json(state.registry.stats().await?))
}
