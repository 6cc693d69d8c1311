//! Message types for the registry actor
//!
//! Every request carries a oneshot `respond_to` channel; the actor answers
//! each command exactly once. Replies are owned snapshots, so nothing a
//! caller holds can observe a later mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::model::NodeSnapshot;
use crate::store::{
    ClusterStats, ConnectionView, IngestReport, NodeView, StoreResult, SweepReport,
    ValidationError,
};

/// Commands that can be sent to the RegistryActor
#[derive(Debug)]
pub enum RegistryCommand {
    /// Apply an agent snapshot
    Ingest {
        snapshot: NodeSnapshot,
        respond_to: oneshot::Sender<Result<IngestReport, ValidationError>>,
    },

    ListNodes {
        respond_to: oneshot::Sender<Vec<NodeView>>,
    },

    GetNode {
        name: String,
        respond_to: oneshot::Sender<Option<NodeView>>,
    },

    /// Administrative removal, cascading to the node's connections
    RemoveNode {
        name: String,
        respond_to: oneshot::Sender<StoreResult<NodeRemoval>>,
    },

    ListConnections {
        respond_to: oneshot::Sender<Vec<ConnectionView>>,
    },

    /// Lookup by endpoint pair; order does not matter when deduplicating
    GetConnection {
        source: String,
        target: String,
        respond_to: oneshot::Sender<Option<ConnectionView>>,
    },

    GetStats {
        respond_to: oneshot::Sender<ClusterStats>,
    },

    /// Run garbage collection
    ///
    /// With `force` unset the sweep only happens if the interval has
    /// elapsed, and `None` is returned otherwise.
    Sweep {
        force: bool,
        respond_to: oneshot::Sender<Option<SweepReport>>,
    },

    /// Counters used by the health endpoint
    GetStatus {
        respond_to: oneshot::Sender<RegistryStatus>,
    },

    /// Gracefully shut down the registry actor
    Shutdown,
}

/// Outcome of removing a node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeRemoval {
    pub node: String,
    pub connections_removed: usize,
}

/// Registry counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryStatus {
    pub nodes: usize,

    /// Stored edges, including ones waiting for an endpoint to report
    pub connections: usize,
    pub max_connections: usize,
    pub last_sweep: Option<DateTime<Utc>>,
}
