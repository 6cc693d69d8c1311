//! The registry: node store + connection store behind one owner
//!
//! Every public method leaves both stores consistent on return. Callers
//! pass the current time explicitly, so the registry itself holds no
//! clock and every time-based rule is testable with fixed instants.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::model::NodeSnapshot;

use super::connections::{AdmissionReport, ConnectionStore};
use super::error::{StoreError, StoreResult, ValidationError};
use super::gc::{GarbageCollector, SweepReport};
use super::record::{ConnectionEdge, NodeRecord};
use super::stats::ClusterStats;
use super::view::{ConnectionView, NodeView};

/// Tunables of the state engine
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySettings {
    /// Silence after which a node is offline
    pub node_timeout: Duration,

    /// Extra time past the timeout before a node is deleted
    pub grace_period: Duration,

    /// Minimum time between two GC sweeps
    pub gc_interval: Duration,

    pub max_connections: usize,
    pub dedup_connections: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            node_timeout: Duration::seconds(120),
            grace_period: Duration::seconds(86_400),
            gc_interval: Duration::seconds(60),
            max_connections: 500,
            dedup_connections: true,
        }
    }
}

/// What a single ingest changed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestReport {
    pub node: String,

    /// First snapshot ever seen for this name
    pub created: bool,
    pub received_at: DateTime<Utc>,
    pub connections_inserted: usize,
    pub connections_replaced: usize,
    pub connections_evicted: usize,
}

#[derive(Debug, Clone)]
pub struct Registry {
    nodes: HashMap<String, NodeRecord>,
    connections: ConnectionStore,
    gc: GarbageCollector,
    node_timeout: Duration,
}

impl Registry {
    pub fn new(settings: RegistrySettings) -> Self {
        debug!("creating registry with {settings:?}");
        Self {
            nodes: HashMap::new(),
            connections: ConnectionStore::new(
                settings.max_connections,
                settings.dedup_connections,
            ),
            gc: GarbageCollector::new(
                settings.node_timeout,
                settings.grace_period,
                settings.gc_interval,
            ),
            node_timeout: settings.node_timeout,
        }
    }

    // ========================================================================
    // Ingest
    // ========================================================================

    /// Validate a snapshot and apply it as one unit
    ///
    /// On error nothing is modified.
    pub fn ingest(
        &mut self,
        snapshot: NodeSnapshot,
        now: DateTime<Utc>,
    ) -> Result<IngestReport, ValidationError> {
        snapshot.validate()?;

        let mut snapshot = snapshot;
        let measurements = std::mem::take(&mut snapshot.connections);
        let name = snapshot.name.clone();

        let created = self.upsert_node(NodeRecord::from_snapshot(snapshot, now), now);

        let edges = measurements
            .into_iter()
            .map(|m| ConnectionEdge::from_measurement(&name, m, now));
        let admission = self.admit_connections(edges);

        trace!(
            "ingested {name}: {} new, {} replaced, {} evicted connection(s)",
            admission.inserted,
            admission.replaced,
            admission.evicted.len()
        );

        Ok(IngestReport {
            node: name,
            created,
            received_at: now,
            connections_inserted: admission.inserted,
            connections_replaced: admission.replaced,
            connections_evicted: admission.evicted.len(),
        })
    }

    // ========================================================================
    // Node store
    // ========================================================================

    /// Insert or fully replace the record for `record.name`, stamping it
    /// with `now`. Returns `true` if the name was new.
    pub fn upsert_node(&mut self, mut record: NodeRecord, now: DateTime<Utc>) -> bool {
        record.received_at = now;
        let name = record.name.clone();
        let created = self.nodes.insert(name.clone(), record).is_none();
        if created {
            info!("registered new node {name}");
        }
        created
    }

    pub fn get_node(&self, name: &str) -> Option<NodeRecord> {
        self.nodes.get(name).cloned()
    }

    /// All records, ordered by name
    pub fn list_nodes(&self) -> Vec<NodeRecord> {
        let mut nodes: Vec<_> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }

    /// Remove a node together with every connection naming it
    pub fn remove_node(&mut self, name: &str) -> StoreResult<(NodeRecord, usize)> {
        let record = self
            .nodes
            .remove(name)
            .ok_or_else(|| StoreError::NodeNotFound(name.to_string()))?;
        let removed_connections = self.connections.remove_touching(name);
        info!("removed node {name} and {removed_connections} connection(s)");
        Ok((record, removed_connections))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ========================================================================
    // Connection store
    // ========================================================================

    pub fn admit_connections(
        &mut self,
        edges: impl IntoIterator<Item = ConnectionEdge>,
    ) -> AdmissionReport {
        self.connections.admit(edges)
    }

    fn resolves(&self, edge: &ConnectionEdge) -> bool {
        self.nodes.contains_key(&edge.source_node) && self.nodes.contains_key(&edge.target_node)
    }

    /// Edge for a pair, hidden while either endpoint is unknown
    pub fn get_connection(&self, source: &str, target: &str) -> Option<ConnectionEdge> {
        self.connections
            .get(source, target)
            .filter(|edge| self.resolves(edge))
            .cloned()
    }

    /// Edges whose endpoints both resolve, in first-insertion order
    pub fn list_connections(&self) -> Vec<ConnectionEdge> {
        self.connections
            .iter_ordered()
            .map(|(_, edge)| edge)
            .filter(|edge| self.resolves(edge))
            .cloned()
            .collect()
    }

    pub fn remove_connection(&mut self, source: &str, target: &str) -> StoreResult<ConnectionEdge> {
        self.connections
            .remove(source, target)
            .ok_or_else(|| StoreError::ConnectionNotFound {
                source: source.to_string(),
                target: target.to_string(),
            })
    }

    /// Stored edges, including ones still waiting for an endpoint
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn max_connections(&self) -> usize {
        self.connections.max_connections()
    }

    // ========================================================================
    // Garbage collection
    // ========================================================================

    pub fn maybe_sweep(&mut self, now: DateTime<Utc>) -> Option<SweepReport> {
        self.gc
            .maybe_sweep(&mut self.nodes, &mut self.connections, now)
    }

    pub fn sweep(&mut self, now: DateTime<Utc>) -> SweepReport {
        self.gc.sweep(&mut self.nodes, &mut self.connections, now)
    }

    pub fn last_sweep(&self) -> Option<DateTime<Utc>> {
        self.gc.last_sweep()
    }

    // ========================================================================
    // Read-side views
    // ========================================================================

    pub fn node_view(&self, name: &str, now: DateTime<Utc>) -> Option<NodeView> {
        self.nodes
            .get(name)
            .map(|record| NodeView::from_record(record, now, self.node_timeout))
    }

    pub fn node_views(&self, now: DateTime<Utc>) -> Vec<NodeView> {
        let mut views: Vec<_> = self
            .nodes
            .values()
            .map(|record| NodeView::from_record(record, now, self.node_timeout))
            .collect();
        views.sort_by(|a, b| a.name.cmp(&b.name));
        views
    }

    pub fn connection_view(&self, source: &str, target: &str) -> Option<ConnectionView> {
        let edge = self.connections.get(source, target)?;
        self.join(edge)
    }

    pub fn connection_views(&self) -> Vec<ConnectionView> {
        self.connections
            .iter_ordered()
            .filter_map(|(_, edge)| self.join(edge))
            .collect()
    }

    fn join(&self, edge: &ConnectionEdge) -> Option<ConnectionView> {
        let source = self.nodes.get(&edge.source_node)?;
        let target = self.nodes.get(&edge.target_node)?;
        Some(ConnectionView::join(edge, source, target))
    }

    pub fn stats(&self, now: DateTime<Utc>) -> ClusterStats {
        ClusterStats::compute(
            self.nodes.values(),
            self.connections.len(),
            self.node_timeout,
            now,
        )
    }
}
