//! Peer latency measurement
//!
//! Latency is the time to complete a TCP handshake with the peer's
//! configured `host:port`. Each peer is probed `samples` times in a row;
//! peers are probed concurrently.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::config::PeerConfig;
use crate::model::LatencyMeasurement;

/// Average, minimum and maximum of a set of round trips
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl LatencySummary {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let min_ms = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg_ms = samples.iter().sum::<f64>() / samples.len() as f64;

        Some(Self {
            // rounding can push the mean outside [min, max] by a hair
            avg_ms: round3(avg_ms).clamp(round3(min_ms), round3(max_ms)),
            min_ms: round3(min_ms),
            max_ms: round3(max_ms),
        })
    }
}

/// One TCP connect; returns the handshake time and the peer's address
pub async fn probe(address: &str, limit: Duration) -> Option<(f64, IpAddr)> {
    let started = Instant::now();
    match timeout(limit, TcpStream::connect(address)).await {
        Ok(Ok(stream)) => {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            let ip = stream.peer_addr().ok()?.ip();
            Some((elapsed_ms, ip))
        }
        Ok(Err(e)) => {
            trace!("probe to {address} failed: {e}");
            None
        }
        Err(_) => {
            trace!("probe to {address} timed out after {limit:?}");
            None
        }
    }
}

/// Probe one peer `samples` times; `None` if every probe failed
pub async fn measure(peer: &PeerConfig, samples: usize, limit: Duration) -> Option<LatencyMeasurement> {
    let mut rtts = Vec::with_capacity(samples);
    let mut target_ip = None;

    for _ in 0..samples.max(1) {
        if let Some((rtt, ip)) = probe(&peer.address, limit).await {
            rtts.push(rtt);
            target_ip = Some(ip);
        }
    }

    let Some(summary) = LatencySummary::from_samples(&rtts) else {
        debug!("peer {} unreachable at {}", peer.name, peer.address);
        return None;
    };

    Some(LatencyMeasurement {
        target_node: peer.name.clone(),
        target_ip: target_ip.map(|ip| ip.to_string()),
        latency_ms: summary.avg_ms,
        min_ms: Some(summary.min_ms),
        max_ms: Some(summary.max_ms),
    })
}

/// Probe all peers concurrently, dropping unreachable ones
pub async fn measure_all(
    peers: &[PeerConfig],
    samples: usize,
    limit: Duration,
) -> Vec<LatencyMeasurement> {
    join_all(peers.iter().map(|peer| measure(peer, samples, limit)))
        .await
        .into_iter()
        .flatten()
        .collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
