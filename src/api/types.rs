//! API response types
//!
//! Shared by the handlers and by clients such as the integration tests,
//! so both sides agree on the wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actors::NodeRemoval;
use crate::store::{ConnectionView, IngestReport, NodeView};

/// Response for GET /api/v1/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub service: String,
    pub status: String,
    pub nodes_count: usize,
    pub connections_count: usize,
    pub max_connections: usize,
    pub last_gc: Option<DateTime<Utc>>,
    pub uptime_seconds: i64,
    pub timestamp: String,
}

/// Response for POST /api/v1/nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub message: String,
    #[serde(flatten)]
    pub report: IngestReport,
}

/// Response for GET /api/v1/nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodesResponse {
    pub nodes: Vec<NodeView>,
    pub count: usize,
}

/// Response for GET /api/v1/connections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionsResponse {
    pub connections: Vec<ConnectionView>,
    pub count: usize,
}

/// Response for DELETE /api/v1/nodes/:name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveNodeResponse {
    pub status: String,
    pub message: String,
    #[serde(flatten)]
    pub removal: NodeRemoval,
}
