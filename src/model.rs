//! Wire types exchanged between agents and the collector
//!
//! An agent pushes one [`NodeSnapshot`] per reporting cycle. The
//! snapshot carries the node's identity, placement, metrics, its own
//! health assessment and the latency it measured to its peers.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::store::error::ValidationError;

/// Node names as Kubernetes and hostnames allow them
static NODE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]{0,251}[A-Za-z0-9])?$")
        .expect("node name pattern is valid")
});

pub fn is_valid_node_name(name: &str) -> bool {
    NODE_NAME.is_match(name)
}

/// Health as assessed by the agent itself
///
/// There is no `Offline` variant: only the collector can
/// decide that a node is unreachable.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SelfReportedStatus {
    #[default]
    Online,
    Warning,
}

impl std::fmt::Display for SelfReportedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelfReportedStatus::Online => write!(f, "online"),
            SelfReportedStatus::Warning => write!(f, "warning"),
        }
    }
}

/// Point-in-time resource usage of a node
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeMetrics {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub disk_percent: Option<f64>,
    pub network_rx_bytes_per_sec: Option<f64>,
    pub network_tx_bytes_per_sec: Option<f64>,
    pub temperature_celsius: Option<f64>,
    pub load_avg_1m: Option<f64>,
    pub load_avg_5m: Option<f64>,
    pub load_avg_15m: Option<f64>,
    pub uptime_seconds: Option<u64>,
}

/// Static facts about the node's OS and runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemInfo {
    pub os_image: Option<String>,
    pub kernel_version: Option<String>,
    pub architecture: Option<String>,
    pub kubelet_version: Option<String>,
    pub container_runtime: Option<String>,
    #[serde(default)]
    pub network_interfaces: Vec<String>,
}

/// Latency measured from the reporting node to one peer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatencyMeasurement {
    pub target_node: String,
    pub target_ip: Option<String>,

    /// Average round trip in milliseconds
    pub latency_ms: f64,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
}

impl LatencyMeasurement {
    pub fn min(&self) -> f64 {
        self.min_ms.unwrap_or(self.latency_ms)
    }

    pub fn max(&self) -> f64 {
        self.max_ms.unwrap_or(self.latency_ms)
    }
}

/// Payload pushed by an agent on every reporting cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSnapshot {
    pub name: String,
    pub hostname: String,
    pub internal_ip: Option<String>,
    pub external_ip: Option<String>,

    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location: Option<String>,
    pub provider: Option<String>,

    #[serde(default)]
    pub status: SelfReportedStatus,

    #[serde(default)]
    pub metrics: NodeMetrics,

    #[serde(default)]
    pub system: SystemInfo,

    #[serde(default)]
    pub connections: Vec<LatencyMeasurement>,

    /// Agent-side send time. Informational only; the collector stamps
    /// its own receive time.
    pub timestamp: Option<f64>,
}

impl NodeSnapshot {
    /// Minimal snapshot with only identity fields set
    pub fn new(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            internal_ip: None,
            external_ip: None,
            lat: None,
            lon: None,
            location: None,
            provider: None,
            status: SelfReportedStatus::Online,
            metrics: NodeMetrics::default(),
            system: SystemInfo::default(),
            connections: Vec::new(),
            timestamp: None,
        }
    }

    /// Check every field the registry relies on
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if !NODE_NAME.is_match(&self.name) {
            return Err(ValidationError::InvalidName(self.name.clone()));
        }
        if self.hostname.trim().is_empty() {
            return Err(ValidationError::EmptyField("hostname"));
        }

        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => {
                check_range("lat", lat, -90.0, 90.0)?;
                check_range("lon", lon, -180.0, 180.0)?;
            }
            (None, None) => {}
            _ => return Err(ValidationError::IncompleteCoordinates),
        }

        self.metrics.validate()?;

        for connection in &self.connections {
            if connection.target_node.trim().is_empty() {
                return Err(ValidationError::EmptyField("connections.target_node"));
            }
            if !NODE_NAME.is_match(&connection.target_node) {
                return Err(ValidationError::InvalidName(connection.target_node.clone()));
            }
            if connection.target_node == self.name {
                return Err(ValidationError::SelfConnection(self.name.clone()));
            }
            check_non_negative("connections.latency_ms", connection.latency_ms)?;
            check_non_negative("connections.min_ms", connection.min())?;
            check_non_negative("connections.max_ms", connection.max())?;
            if connection.min() > connection.latency_ms || connection.latency_ms > connection.max()
            {
                return Err(ValidationError::InconsistentLatency {
                    target: connection.target_node.clone(),
                });
            }
        }

        Ok(())
    }
}

impl NodeMetrics {
    fn validate(&self) -> Result<(), ValidationError> {
        let percentages = [
            ("metrics.cpu_percent", self.cpu_percent),
            ("metrics.memory_percent", self.memory_percent),
            ("metrics.disk_percent", self.disk_percent),
        ];
        for (field, value) in percentages {
            if let Some(value) = value {
                check_range(field, value, 0.0, 100.0)?;
            }
        }

        let non_negative = [
            ("metrics.network_rx_bytes_per_sec", self.network_rx_bytes_per_sec),
            ("metrics.network_tx_bytes_per_sec", self.network_tx_bytes_per_sec),
            ("metrics.load_avg_1m", self.load_avg_1m),
            ("metrics.load_avg_5m", self.load_avg_5m),
            ("metrics.load_avg_15m", self.load_avg_15m),
        ];
        for (field, value) in non_negative {
            if let Some(value) = value {
                check_non_negative(field, value)?;
            }
        }

        // sub-zero readings are legitimate for outdoor hardware
        if let Some(temperature) = self.temperature_celsius {
            check_range("metrics.temperature_celsius", temperature, -273.15, 1000.0)?;
        }

        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite(field));
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, value });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    check_range(field, value, 0.0, f64::MAX)
}
