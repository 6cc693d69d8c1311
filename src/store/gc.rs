//! Garbage collection of stale nodes and connections
//!
//! ## Policy
//!
//! A node is reclaimed once `now - received_at > timeout + grace`. The
//! same sweep drops every connection naming that node, so no edge can
//! outlive its endpoint. Connections go stale under the same threshold
//! on their own `received_at`.
//!
//! ## Cadence
//!
//! Sweeping is O(store size), so it is rate limited: the collector keeps
//! the time of its last sweep and only sweeps again once `interval` has
//! passed, however often it is asked.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::connections::ConnectionStore;
use super::error::SweepError;
use super::record::NodeRecord;

/// Result of one sweep
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepReport {
    pub swept_at: DateTime<Utc>,
    pub nodes_removed: Vec<String>,
    pub connections_removed: usize,

    /// Records that could not be evaluated and were left in place
    pub errors: usize,
}

#[derive(Debug, Clone)]
pub struct GarbageCollector {
    timeout: Duration,
    grace: Duration,
    interval: Duration,
    last_sweep: Option<DateTime<Utc>>,
}

impl GarbageCollector {
    pub fn new(timeout: Duration, grace: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            grace,
            interval,
            last_sweep: None,
        }
    }

    /// Age past which a record is reclaimed
    pub fn threshold(&self) -> Duration {
        self.timeout.checked_add(&self.grace).unwrap_or(Duration::MAX)
    }

    pub fn last_sweep(&self) -> Option<DateTime<Utc>> {
        self.last_sweep
    }

    /// Whether enough time has passed since the previous sweep
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_sweep {
            None => true,
            // a clock that moved backwards must not stall collection
            Some(last) if now < last => true,
            Some(last) => now.signed_duration_since(last) >= self.interval,
        }
    }

    /// Decide whether a single record is past the grace window
    pub fn is_expired(
        &self,
        key: &str,
        received_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, SweepError> {
        let age = now.signed_duration_since(received_at);
        if age < Duration::zero() {
            return Err(SweepError::FutureTimestamp {
                key: key.to_string(),
                received_at,
                now,
            });
        }
        Ok(age > self.threshold())
    }

    /// Sweep only if the interval has elapsed
    pub fn maybe_sweep(
        &mut self,
        nodes: &mut HashMap<String, NodeRecord>,
        connections: &mut ConnectionStore,
        now: DateTime<Utc>,
    ) -> Option<SweepReport> {
        if !self.is_due(now) {
            trace!("gc not due yet (last sweep {:?})", self.last_sweep);
            return None;
        }
        Some(self.sweep(nodes, connections, now))
    }

    /// Sweep unconditionally
    pub fn sweep(
        &mut self,
        nodes: &mut HashMap<String, NodeRecord>,
        connections: &mut ConnectionStore,
        now: DateTime<Utc>,
    ) -> SweepReport {
        debug!("running gc sweep at {now}");

        let mut errors = 0;
        let mut expired_nodes = Vec::new();

        for (name, record) in nodes.iter() {
            match self.is_expired(name, record.received_at, now) {
                Ok(true) => expired_nodes.push(name.clone()),
                Ok(false) => {}
                Err(e) => {
                    warn!("gc skipped node: {e}");
                    errors += 1;
                }
            }
        }
        expired_nodes.sort();

        let mut connections_removed = 0;
        for name in &expired_nodes {
            nodes.remove(name);
            connections_removed += connections.remove_touching(name);
        }

        connections_removed += connections.retain(|key, edge| {
            match self.is_expired(&key.to_string(), edge.received_at, now) {
                Ok(expired) => !expired,
                Err(e) => {
                    warn!("gc skipped connection: {e}");
                    errors += 1;
                    true
                }
            }
        });

        self.last_sweep = Some(now);

        if !expired_nodes.is_empty() || connections_removed > 0 {
            info!(
                "gc removed {} node(s) and {} connection(s)",
                expired_nodes.len(),
                connections_removed
            );
        } else {
            trace!("gc: nothing to remove");
        }

        SweepReport {
            swept_at: now,
            nodes_removed: expired_nodes,
            connections_removed,
            errors,
        }
    }
}
