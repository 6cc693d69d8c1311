//! Helper functions for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use meshmap::{
    actors::RegistryHandle,
    clock::ManualClock,
    model::{LatencyMeasurement, NodeSnapshot},
    store::RegistrySettings,
};

pub fn start_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

pub fn spawn_registry(settings: RegistrySettings) -> (RegistryHandle, ManualClock) {
    let clock = ManualClock::new(start_time());
    let handle = RegistryHandle::spawn_with_clock(settings, Arc::new(clock.clone()));
    (handle, clock)
}

pub fn measurement(target: &str, latency_ms: f64) -> LatencyMeasurement {
    LatencyMeasurement {
        target_node: target.to_string(),
        target_ip: None,
        latency_ms,
        min_ms: Some(latency_ms),
        max_ms: Some(latency_ms),
    }
}

pub fn create_test_snapshot(name: &str, peers: &[&str]) -> NodeSnapshot {
    let mut snapshot = NodeSnapshot::new(name, format!("{name}.local"));
    snapshot.metrics.cpu_percent = Some(25.0);
    snapshot.metrics.memory_percent = Some(50.0);
    snapshot.connections = peers.iter().map(|peer| measurement(peer, 12.5)).collect();
    snapshot
}

pub fn located_snapshot(name: &str, lat: f64, lon: f64, provider: &str) -> NodeSnapshot {
    let mut snapshot = create_test_snapshot(name, &[]);
    snapshot.lat = Some(lat);
    snapshot.lon = Some(lon);
    snapshot.provider = Some(provider.to_string());
    snapshot
}
