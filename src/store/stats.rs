//! Cluster-wide rollups computed on demand

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::liveness::{NodeStatus, classify};
use super::record::NodeRecord;

/// Provider label used for nodes that do not report one
pub const UNKNOWN_PROVIDER: &str = "unknown";

/// Aggregated view of the cluster
///
/// Averages only include nodes currently classified `online`; warning
/// and offline nodes are counted but never averaged. With no online
/// node every average is `0.0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterStats {
    pub total_nodes: usize,
    pub online_nodes: usize,
    pub warning_nodes: usize,
    pub offline_nodes: usize,

    pub avg_cpu_percent: f64,
    pub avg_memory_percent: f64,
    pub avg_disk_percent: f64,
    pub avg_temperature_celsius: f64,
    pub avg_network_rx_bytes_per_sec: f64,
    pub avg_network_tx_bytes_per_sec: f64,
    pub avg_load_avg_1m: f64,

    /// Node count per provider, regardless of status
    pub providers: BTreeMap<String, usize>,

    pub total_connections: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn value(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.sum / self.count as f64;
        (mean * 100.0).round() / 100.0
    }
}

impl ClusterStats {
    pub fn compute<'a>(
        nodes: impl IntoIterator<Item = &'a NodeRecord>,
        total_connections: usize,
        timeout: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let (mut online, mut warning, mut offline) = (0, 0, 0);
        let mut providers = BTreeMap::new();
        let mut cpu = Mean::default();
        let mut memory = Mean::default();
        let mut disk = Mean::default();
        let mut temperature = Mean::default();
        let mut rx = Mean::default();
        let mut tx = Mean::default();
        let mut load = Mean::default();

        for node in nodes {
            let provider = node.provider.as_deref().unwrap_or(UNKNOWN_PROVIDER);
            *providers.entry(provider.to_string()).or_insert(0) += 1;

            match classify(node.self_reported_status, node.received_at, now, timeout) {
                NodeStatus::Online => {
                    online += 1;
                    let m = &node.metrics;
                    cpu.add(m.cpu_percent);
                    memory.add(m.memory_percent);
                    disk.add(m.disk_percent);
                    temperature.add(m.temperature_celsius);
                    rx.add(m.network_rx_bytes_per_sec);
                    tx.add(m.network_tx_bytes_per_sec);
                    load.add(m.load_avg_1m);
                }
                NodeStatus::Warning => warning += 1,
                NodeStatus::Offline => offline += 1,
            }
        }

        Self {
            total_nodes: online + warning + offline,
            online_nodes: online,
            warning_nodes: warning,
            offline_nodes: offline,
            avg_cpu_percent: cpu.value(),
            avg_memory_percent: memory.value(),
            avg_disk_percent: disk.value(),
            avg_temperature_celsius: temperature.value(),
            avg_network_rx_bytes_per_sec: rx.value(),
            avg_network_tx_bytes_per_sec: tx.value(),
            avg_load_avg_1m: load.value(),
            providers,
            total_connections,
            timestamp: now,
        }
    }
}
