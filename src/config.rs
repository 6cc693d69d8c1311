use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration as StdDuration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::model::{NodeSnapshot, is_valid_node_name};
use crate::store::RegistrySettings;
use crate::util::{env_string, parse_flag, parse_setting};

pub const NODE_TIMEOUT_SECONDS: &str = "NODE_TIMEOUT_SECONDS";
pub const CLEANUP_GRACE_PERIOD_SECONDS: &str = "CLEANUP_GRACE_PERIOD_SECONDS";
pub const GC_INTERVAL_SECONDS: &str = "GC_INTERVAL_SECONDS";
pub const MAX_CONNECTIONS: &str = "MAX_CONNECTIONS";
pub const DEDUP_CONNECTIONS: &str = "DEDUP_CONNECTIONS";
pub const COLLECTOR_ADDR: &str = "COLLECTOR_ADDR";
pub const COLLECTOR_PORT: &str = "COLLECTOR_PORT";
pub const COLLECTOR_CORS: &str = "COLLECTOR_CORS";

const DEFAULT_PORT: u16 = 8000;

/// Collector configuration
///
/// Precedence, lowest first: built-in defaults, the optional JSON file,
/// environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectorConfig {
    /// Silence after which a node is reported offline
    pub node_timeout_seconds: u64,

    /// How long an offline node is kept before it is deleted
    pub cleanup_grace_period_seconds: u64,

    /// Minimum time between two GC sweeps
    pub gc_interval_seconds: u64,

    pub max_connections: usize,

    /// Merge `A -> B` and `B -> A` into one edge
    pub dedup_connections: bool,

    pub bind_addr: IpAddr,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            node_timeout_seconds: 120,
            cleanup_grace_period_seconds: 86_400,
            gc_interval_seconds: 60,
            max_connections: 500,
            dedup_connections: true,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            enable_cors: true,
        }
    }
}

impl CollectorConfig {
    pub fn apply_env(&mut self) {
        self.apply_overrides(env_string);
    }

    /// Override fields from a key lookup; invalid values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = parse_setting(NODE_TIMEOUT_SECONDS, lookup(NODE_TIMEOUT_SECONDS)) {
            self.node_timeout_seconds = v;
        }
        if let Some(v) = parse_setting(
            CLEANUP_GRACE_PERIOD_SECONDS,
            lookup(CLEANUP_GRACE_PERIOD_SECONDS),
        ) {
            self.cleanup_grace_period_seconds = v;
        }
        if let Some(v) = parse_setting(GC_INTERVAL_SECONDS, lookup(GC_INTERVAL_SECONDS)) {
            self.gc_interval_seconds = v;
        }
        if let Some(v) = parse_setting(MAX_CONNECTIONS, lookup(MAX_CONNECTIONS)) {
            self.max_connections = v;
        }
        if let Some(v) = parse_flag(DEDUP_CONNECTIONS, lookup(DEDUP_CONNECTIONS)) {
            self.dedup_connections = v;
        }
        if let Some(v) = parse_setting(COLLECTOR_ADDR, lookup(COLLECTOR_ADDR)) {
            self.bind_addr = v;
        }
        if let Some(v) = parse_setting(COLLECTOR_PORT, lookup(COLLECTOR_PORT)) {
            self.port = v;
        }
        if let Some(v) = parse_flag(COLLECTOR_CORS, lookup(COLLECTOR_CORS)) {
            self.enable_cors = v;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.node_timeout_seconds == 0 {
            bail!("node_timeout_seconds must be at least 1");
        }
        if self.max_connections == 0 {
            bail!("max_connections must be at least 1");
        }
        if self.gc_interval_seconds == 0 {
            bail!("gc_interval_seconds must be at least 1");
        }
        self.settings().map(|_| ())
    }

    pub fn settings(&self) -> anyhow::Result<RegistrySettings> {
        Ok(RegistrySettings {
            node_timeout: seconds("node_timeout_seconds", self.node_timeout_seconds)?,
            grace_period: seconds(
                "cleanup_grace_period_seconds",
                self.cleanup_grace_period_seconds,
            )?,
            gc_interval: seconds("gc_interval_seconds", self.gc_interval_seconds)?,
            max_connections: self.max_connections,
            dedup_connections: self.dedup_connections,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    #[cfg(feature = "api")]
    pub fn api_config(&self) -> crate::api::ApiConfig {
        crate::api::ApiConfig {
            bind_addr: self.socket_addr(),
            enable_cors: self.enable_cors,
        }
    }
}

fn seconds(field: &str, secs: u64) -> anyhow::Result<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .with_context(|| format!("{field} is out of range: {secs}"))
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<CollectorConfig> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read config file {}", path.display()))?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

// ============================================================================
// Agent
// ============================================================================

pub const COLLECTOR_URL: &str = "COLLECTOR_URL";
pub const REPORT_INTERVAL: &str = "REPORT_INTERVAL";
pub const NODE_NAME: &str = "NODE_NAME";
pub const NODE_HOSTNAME: &str = "NODE_HOSTNAME";
pub const NODE_INTERNAL_IP: &str = "NODE_INTERNAL_IP";
pub const NODE_EXTERNAL_IP: &str = "NODE_EXTERNAL_IP";
pub const NODE_LAT: &str = "NODE_LAT";
pub const NODE_LON: &str = "NODE_LON";
pub const NODE_LOCATION: &str = "NODE_LOCATION";
pub const NODE_PROVIDER: &str = "NODE_PROVIDER";
pub const NODE_KUBELET_VERSION: &str = "NODE_KUBELET_VERSION";
pub const NODE_CONTAINER_RUNTIME: &str = "NODE_CONTAINER_RUNTIME";
pub const PEERS: &str = "PEERS";
pub const LATENCY_SAMPLES: &str = "LATENCY_SAMPLES";
pub const PROBE_TIMEOUT_MS: &str = "PROBE_TIMEOUT_MS";
pub const WARN_CPU_PERCENT: &str = "WARN_CPU_PERCENT";
pub const WARN_MEMORY_PERCENT: &str = "WARN_MEMORY_PERCENT";
pub const WARN_DISK_PERCENT: &str = "WARN_DISK_PERCENT";

const DEFAULT_COLLECTOR_URL: &str = "http://127.0.0.1:8000";

/// A peer the agent measures latency to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    /// Node name the peer reports under
    pub name: String,

    /// `host:port` used for the TCP connect probe
    pub address: String,
}

/// Usage at or above which the agent reports itself as `warning`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarningThresholds {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

impl Default for WarningThresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 90.0,
            memory_percent: 90.0,
            disk_percent: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub collector_url: String,
    pub report_interval: StdDuration,

    pub node_name: String,
    pub hostname: String,
    pub internal_ip: Option<String>,
    pub external_ip: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location: Option<String>,
    pub provider: Option<String>,
    pub kubelet_version: Option<String>,
    pub container_runtime: Option<String>,

    pub peers: Vec<PeerConfig>,
    pub latency_samples: usize,
    pub probe_timeout: StdDuration,
    pub thresholds: WarningThresholds,
}

impl AgentConfig {
    pub fn new(node_name: impl Into<String>) -> Self {
        let node_name = node_name.into();
        Self {
            collector_url: DEFAULT_COLLECTOR_URL.to_string(),
            report_interval: StdDuration::from_secs(30),
            hostname: node_name.clone(),
            node_name,
            internal_ip: None,
            external_ip: None,
            lat: None,
            lon: None,
            location: None,
            provider: None,
            kubelet_version: None,
            container_runtime: None,
            peers: Vec::new(),
            latency_samples: 3,
            probe_timeout: StdDuration::from_millis(1000),
            thresholds: WarningThresholds::default(),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(env_string)
    }

    /// Build the agent configuration from a key lookup
    ///
    /// The node name falls back to the machine's host name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let node_name = lookup(NODE_NAME)
            .or_else(sysinfo::System::host_name)
            .context("NODE_NAME is not set and the host name is unknown")?;

        let mut config = Self::new(node_name);

        if let Some(url) = lookup(COLLECTOR_URL) {
            config.collector_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_setting::<u64>(REPORT_INTERVAL, lookup(REPORT_INTERVAL)) {
            config.report_interval = StdDuration::from_secs(secs.max(1));
        }
        if let Some(hostname) = lookup(NODE_HOSTNAME) {
            config.hostname = hostname;
        }
        config.internal_ip = lookup(NODE_INTERNAL_IP);
        config.external_ip = lookup(NODE_EXTERNAL_IP);
        config.lat = parse_setting(NODE_LAT, lookup(NODE_LAT));
        config.lon = parse_setting(NODE_LON, lookup(NODE_LON));
        config.location = lookup(NODE_LOCATION);
        config.provider = lookup(NODE_PROVIDER);
        config.kubelet_version = lookup(NODE_KUBELET_VERSION);
        config.container_runtime = lookup(NODE_CONTAINER_RUNTIME);

        if let Some(peers) = lookup(PEERS) {
            config.peers = parse_peers(&peers)?;
        }
        if let Some(n) = parse_setting::<usize>(LATENCY_SAMPLES, lookup(LATENCY_SAMPLES)) {
            config.latency_samples = n.max(1);
        }
        if let Some(ms) = parse_setting::<u64>(PROBE_TIMEOUT_MS, lookup(PROBE_TIMEOUT_MS)) {
            config.probe_timeout = StdDuration::from_millis(ms.max(1));
        }
        if let Some(v) = parse_setting(WARN_CPU_PERCENT, lookup(WARN_CPU_PERCENT)) {
            config.thresholds.cpu_percent = v;
        }
        if let Some(v) = parse_setting(WARN_MEMORY_PERCENT, lookup(WARN_MEMORY_PERCENT)) {
            config.thresholds.memory_percent = v;
        }
        if let Some(v) = parse_setting(WARN_DISK_PERCENT, lookup(WARN_DISK_PERCENT)) {
            config.thresholds.disk_percent = v;
        }

        config.validate()?;
        trace!("loaded agent config: {config:?}");
        Ok(config)
    }

    /// Fail on an identity the collector would answer with 400
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut identity = NodeSnapshot::new(&self.node_name, &self.hostname);
        identity.lat = self.lat;
        identity.lon = self.lon;
        identity
            .validate()
            .with_context(|| format!("node {:?} is misconfigured", self.node_name))
    }
}

/// Parse `name=host:port,name=host:port`
pub fn parse_peers(raw: &str) -> anyhow::Result<Vec<PeerConfig>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> anyhow::Result<PeerConfig> {
            let (name, address) = entry
                .split_once('=')
                .with_context(|| format!("peer entry {entry:?} is not name=host:port"))?;
            let (name, address) = (name.trim(), address.trim());
            if name.is_empty() {
                bail!("peer entry {entry:?} has an empty name");
            }
            if !is_valid_node_name(name) {
                bail!("peer entry {entry:?} has an invalid node name");
            }
            match address.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
                _ => bail!("peer entry {entry:?} needs an address of the form host:port"),
            }
            Ok(PeerConfig {
                name: name.to_string(),
                address: address.to_string(),
            })
        })
        .collect()
}
