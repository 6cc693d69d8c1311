//! Node agent
//!
//! Runs on every node. Each cycle it samples local resources, measures
//! latency to its configured peers and pushes one snapshot to the
//! collector. A failed push is logged and retried on the next cycle;
//! the agent never exits because the collector is unreachable.

pub mod latency;
pub mod system;

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

use crate::config::AgentConfig;
use crate::model::{LatencyMeasurement, NodeMetrics, NodeSnapshot, SystemInfo};

use self::system::{SystemSampler, assess};

/// Timeout of one push to the collector
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Assemble the payload for one cycle
///
/// Probes to the node itself are dropped, since the collector rejects
/// self-connections.
pub fn compose_snapshot(
    config: &AgentConfig,
    metrics: NodeMetrics,
    mut system: SystemInfo,
    connections: Vec<LatencyMeasurement>,
) -> NodeSnapshot {
    let status = assess(&metrics, &config.thresholds);
    system.kubelet_version = config.kubelet_version.clone();
    system.container_runtime = config.container_runtime.clone();

    NodeSnapshot {
        name: config.node_name.clone(),
        hostname: config.hostname.clone(),
        internal_ip: config.internal_ip.clone(),
        external_ip: config.external_ip.clone(),
        lat: config.lat,
        lon: config.lon,
        location: config.location.clone(),
        provider: config.provider.clone(),
        status,
        metrics,
        system,
        connections: connections
            .into_iter()
            .filter(|m| m.target_node != config.node_name)
            .collect(),
        timestamp: Some(Utc::now().timestamp_millis() as f64 / 1000.0),
    }
}

pub struct Reporter {
    config: AgentConfig,
    client: reqwest::Client,
    sampler: SystemSampler,
}

impl Reporter {
    pub fn new(config: AgentConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .context("could not build http client")?;

        Ok(Self {
            config,
            client,
            sampler: SystemSampler::new(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/v1/nodes", self.config.collector_url)
    }

    /// Sample resources and probe peers
    pub async fn collect(&mut self) -> NodeSnapshot {
        let (metrics, system) = self.sampler.sample();
        let connections = latency::measure_all(
            &self.config.peers,
            self.config.latency_samples,
            self.config.probe_timeout,
        )
        .await;

        compose_snapshot(&self.config, metrics, system, connections)
    }

    /// POST a snapshot; any non-2xx answer is an error
    pub async fn send(&self, snapshot: &NodeSnapshot) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.endpoint())
            .json(snapshot)
            .send()
            .await
            .with_context(|| format!("could not reach collector at {}", self.endpoint()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("collector answered {status}: {body}");
        }
        Ok(())
    }

    pub async fn report_once(&mut self) -> anyhow::Result<()> {
        let snapshot = self.collect().await;
        self.send(&snapshot).await?;
        debug!(
            "reported {} ({} connection(s), status {})",
            snapshot.name,
            snapshot.connections.len(),
            snapshot.status
        );
        Ok(())
    }

    /// Report forever at the configured interval
    #[instrument(skip(self), fields(node = %self.config.node_name))]
    pub async fn run(mut self) {
        info!("starting agent on {}", self.config.node_name);
        info!("collector URL: {}", self.endpoint());
        info!("report interval: {:?}", self.config.report_interval);

        // cpu usage needs two refreshes some time apart
        time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;

        let mut interval = time::interval(self.config.report_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = self.report_once().await {
                error!("failed to report: {e:#}");
            }
        }
    }
}
