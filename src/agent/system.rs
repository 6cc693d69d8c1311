//! Local resource sampling via sysinfo

use std::time::Instant;

use sysinfo::{Components, Disks, Networks, System};
use tracing::trace;

use crate::config::WarningThresholds;
use crate::model::{NodeMetrics, SelfReportedStatus, SystemInfo};

/// Keeps sysinfo state between samples so CPU usage and network rates
/// are measured over the reporting interval.
pub struct SystemSampler {
    sys: System,
    networks: Networks,
    last_network_refresh: Instant,
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        Self {
            sys,
            networks: Networks::new_with_refreshed_list(),
            last_network_refresh: Instant::now(),
        }
    }

    pub fn sample(&mut self) -> (NodeMetrics, SystemInfo) {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        let elapsed = self.last_network_refresh.elapsed().as_secs_f64();
        self.networks.refresh(true);
        self.last_network_refresh = Instant::now();

        let (rx, tx) = self
            .networks
            .iter()
            .fold((0u64, 0u64), |(rx, tx), (_, data)| {
                (rx + data.received(), tx + data.transmitted())
            });
        let rate = |bytes: u64| (elapsed > 0.0).then(|| round2(bytes as f64 / elapsed));

        let load = System::load_average();

        let metrics = NodeMetrics {
            cpu_percent: finite(self.sys.global_cpu_usage() as f64).map(|v| round2(v.clamp(0.0, 100.0))),
            memory_percent: percent(self.sys.used_memory(), self.sys.total_memory()),
            disk_percent: disk_usage(),
            network_rx_bytes_per_sec: rate(rx),
            network_tx_bytes_per_sec: rate(tx),
            temperature_celsius: average_temperature(),
            load_avg_1m: finite(load.one),
            load_avg_5m: finite(load.five),
            load_avg_15m: finite(load.fifteen),
            uptime_seconds: Some(System::uptime()),
        };

        let mut network_interfaces: Vec<String> =
            self.networks.iter().map(|(name, _)| name.clone()).collect();
        network_interfaces.sort();

        let system = SystemInfo {
            os_image: System::long_os_version(),
            kernel_version: System::kernel_version(),
            architecture: Some(System::cpu_arch()),
            kubelet_version: None,
            container_runtime: None,
            network_interfaces,
        };

        trace!("sampled metrics: {metrics:?}");
        (metrics, system)
    }
}

/// `warning` once any usage metric reaches its threshold
pub fn assess(metrics: &NodeMetrics, thresholds: &WarningThresholds) -> SelfReportedStatus {
    let exceeds = |value: Option<f64>, limit: f64| value.is_some_and(|v| v >= limit);

    if exceeds(metrics.cpu_percent, thresholds.cpu_percent)
        || exceeds(metrics.memory_percent, thresholds.memory_percent)
        || exceeds(metrics.disk_percent, thresholds.disk_percent)
    {
        SelfReportedStatus::Warning
    } else {
        SelfReportedStatus::Online
    }
}

fn disk_usage() -> Option<f64> {
    let disks = Disks::new_with_refreshed_list();
    let (total, available) = disks
        .iter()
        .fold((0u64, 0u64), |(total, available), disk| {
            (total + disk.total_space(), available + disk.available_space())
        });
    percent(total.saturating_sub(available), total)
}

fn average_temperature() -> Option<f64> {
    let components = Components::new_with_refreshed_list();
    let temperatures: Vec<f64> = components
        .iter()
        .filter_map(|component| component.temperature())
        .filter_map(|t| finite(t as f64))
        .collect();

    if temperatures.is_empty() {
        return None;
    }
    let sum: f64 = temperatures.iter().sum();
    Some(round2(sum / temperatures.len() as f64))
}

fn percent(used: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(round2((used as f64 / total as f64 * 100.0).clamp(0.0, 100.0)))
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
