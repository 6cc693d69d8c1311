//! Read-side projections handed to query clients

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{NodeMetrics, SelfReportedStatus, SystemInfo};

use super::liveness::{NodeStatus, classify, describe_age};
use super::record::{ConnectionEdge, NodeRecord};

/// A node as a client sees it, with status derived at read time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeView {
    pub name: String,
    pub hostname: String,
    pub internal_ip: Option<String>,
    pub external_ip: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location: Option<String>,
    pub provider: Option<String>,
    pub status: NodeStatus,
    pub self_reported_status: SelfReportedStatus,
    pub metrics: NodeMetrics,
    pub system: SystemInfo,

    /// e.g. `30s ago`
    pub last_seen: String,
    pub last_seen_at: DateTime<Utc>,
    pub seconds_since_seen: i64,
}

impl NodeView {
    pub fn from_record(record: &NodeRecord, now: DateTime<Utc>, timeout: Duration) -> Self {
        let elapsed = now.signed_duration_since(record.received_at);
        Self {
            name: record.name.clone(),
            hostname: record.hostname.clone(),
            internal_ip: record.internal_ip.clone(),
            external_ip: record.external_ip.clone(),
            lat: record.lat,
            lon: record.lon,
            location: record.location.clone(),
            provider: record.provider.clone(),
            status: classify(record.self_reported_status, record.received_at, now, timeout),
            self_reported_status: record.self_reported_status,
            metrics: record.metrics.clone(),
            system: record.system.clone(),
            last_seen: describe_age(elapsed),
            last_seen_at: record.received_at,
            seconds_since_seen: elapsed.num_seconds().max(0),
        }
    }
}

/// An edge joined with both endpoints' coordinates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionView {
    pub source_node: String,
    pub target_node: String,
    pub target_ip: Option<String>,
    pub latency_avg_ms: f64,
    pub latency_min_ms: f64,
    pub latency_max_ms: f64,
    pub received_at: DateTime<Utc>,
    pub source_lat: Option<f64>,
    pub source_lon: Option<f64>,
    pub target_lat: Option<f64>,
    pub target_lon: Option<f64>,
}

impl ConnectionView {
    pub fn join(edge: &ConnectionEdge, source: &NodeRecord, target: &NodeRecord) -> Self {
        Self {
            source_node: edge.source_node.clone(),
            target_node: edge.target_node.clone(),
            target_ip: edge.target_ip.clone(),
            latency_avg_ms: edge.latency_avg_ms,
            latency_min_ms: edge.latency_min_ms,
            latency_max_ms: edge.latency_max_ms,
            received_at: edge.received_at,
            source_lat: source.lat,
            source_lon: source.lon,
            target_lat: target.lat,
            target_lon: target.lon,
        }
    }
}
