//! Connection endpoints

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::{error::ApiResult, state::ApiState, types::ConnectionsResponse};
use crate::store::ConnectionView;

/// GET /api/v1/connections
///
/// Edges whose endpoints both exist, with coordinates of both ends
pub async fn list_connections(State(state): State<ApiState>) -> ApiResult<Json<ConnectionsResponse>> {
    let connections = state.registry.list_connections().await?;

    Ok(Json(ConnectionsResponse {
        count: connections.len(),
        connections,
    }))
}

/// GET /api/v1/connections/:source/:target
pub async fn get_connection(
    State(state): State<ApiState>,
    Path((source, target)): Path<(String, String)>,
) -> ApiResult<Json<ConnectionView>> {
    Ok(Json(state.registry.get_connection(&source, &target).await?))
}
