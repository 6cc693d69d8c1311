//! Node endpoints

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use tracing::{debug, info};

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{IngestResponse, NodesResponse, RemoveNodeResponse},
};
use crate::model::NodeSnapshot;
use crate::store::NodeView;

/// POST /api/v1/nodes
///
/// Accepts one agent snapshot. Malformed or invalid payloads get a 400
/// and leave the registry untouched.
pub async fn ingest_node(
    State(state): State<ApiState>,
    payload: Result<Json<NodeSnapshot>, JsonRejection>,
) -> ApiResult<Json<IngestResponse>> {
    let Json(snapshot) = payload?;
    let report = state.registry.ingest(snapshot).await?;

    debug!("received data from node {}", report.node);

    Ok(Json(IngestResponse {
        status: "success".to_string(),
        message: format!("Data received from {}", report.node),
        report,
    }))
}

/// GET /api/v1/nodes
pub async fn list_nodes(State(state): State<ApiState>) -> ApiResult<Json<NodesResponse>> {
    let nodes = state.registry.list_nodes().await?;

    Ok(Json(NodesResponse {
        count: nodes.len(),
        nodes,
    }))
}

/// GET /api/v1/nodes/:name
pub async fn get_node(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<NodeView>> {
    Ok(Json(state.registry.get_node(&name).await?))
}

/// DELETE /api/v1/nodes/:name
///
/// Removes the node and every connection naming it
pub async fn remove_node(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<RemoveNodeResponse>> {
    let removal = state.registry.remove_node(&name).await?;
    info!(
        "node {} removed via api ({} connection(s))",
        removal.node, removal.connections_removed
    );

    Ok(Json(RemoveNodeResponse {
        status: "success".to_string(),
        message: format!("Node {} removed", removal.node),
        removal,
    }))
}
