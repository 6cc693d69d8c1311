//! Records held by the registry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{LatencyMeasurement, NodeMetrics, NodeSnapshot, SelfReportedStatus, SystemInfo};

/// Latest known state of one node
///
/// A record is always replaced as a whole on ingest, so nothing from an
/// older snapshot can survive into a newer one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeRecord {
    pub name: String,
    pub hostname: String,
    pub internal_ip: Option<String>,
    pub external_ip: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location: Option<String>,
    pub provider: Option<String>,
    pub metrics: NodeMetrics,
    pub system: SystemInfo,
    pub self_reported_status: SelfReportedStatus,

    /// Collector clock at ingest
    pub received_at: DateTime<Utc>,
}

impl NodeRecord {
    /// Build a record from a snapshot, discarding the connection list
    pub fn from_snapshot(snapshot: NodeSnapshot, received_at: DateTime<Utc>) -> Self {
        Self {
            name: snapshot.name,
            hostname: snapshot.hostname,
            internal_ip: snapshot.internal_ip,
            external_ip: snapshot.external_ip,
            lat: snapshot.lat,
            lon: snapshot.lon,
            location: snapshot.location,
            provider: snapshot.provider,
            metrics: snapshot.metrics,
            system: snapshot.system,
            self_reported_status: snapshot.status,
            received_at,
        }
    }

    /// Coordinates, if the node is placed on the map
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}

/// Latency between two nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionEdge {
    pub source_node: String,
    pub target_node: String,
    pub target_ip: Option<String>,
    pub latency_avg_ms: f64,
    pub latency_min_ms: f64,
    pub latency_max_ms: f64,
    pub received_at: DateTime<Utc>,
}

impl ConnectionEdge {
    pub fn from_measurement(
        source: &str,
        measurement: LatencyMeasurement,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_node: source.to_string(),
            latency_avg_ms: measurement.latency_ms,
            latency_min_ms: measurement.min(),
            latency_max_ms: measurement.max(),
            target_node: measurement.target_node,
            target_ip: measurement.target_ip,
            received_at,
        }
    }

    pub fn touches(&self, node: &str) -> bool {
        self.source_node == node || self.target_node == node
    }
}

/// Identity of an edge in the connection store
///
/// Canonical keys order their endpoints so `(A, B)` and `(B, A)` map to
/// the same key; directed keys keep the reported order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    first: String,
    second: String,
}

impl EdgeKey {
    pub fn canonical(a: &str, b: &str) -> Self {
        if a <= b {
            Self::directed(a, b)
        } else {
            Self::directed(b, a)
        }
    }

    pub fn directed(source: &str, target: &str) -> Self {
        Self {
            first: source.to_string(),
            second: target.to_string(),
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.first, &self.second)
    }

    pub fn touches(&self, node: &str) -> bool {
        self.first == node || self.second == node
    }
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<->{}", self.first, self.second)
    }
}
