//! Connection store and admission control
//!
//! Latency measurements enter the mesh through [`ConnectionStore::admit`]:
//!
//! - **Dedup**: one edge per key, last write (by `received_at`) wins
//! - **Capacity**: the store never holds more than `max_connections`;
//!   overflow evicts the oldest `received_at` first, ties broken by the
//!   order in which keys were first inserted
//!
//! Endpoints are not checked against the node store here. An edge may
//! arrive before its peer's first snapshot; readers filter such edges.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::record::{ConnectionEdge, EdgeKey};

#[derive(Debug, Clone)]
struct StoredEdge {
    edge: ConnectionEdge,

    /// Position of the key's first insertion, kept across replacements
    seq: u64,
}

/// Outcome of admitting one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdmissionReport {
    pub inserted: usize,
    pub replaced: usize,

    /// Measurements older than what the store already holds
    pub ignored: usize,

    pub evicted: Vec<EdgeKey>,
}

#[derive(Debug, Clone)]
pub struct ConnectionStore {
    edges: HashMap<EdgeKey, StoredEdge>,
    next_seq: u64,
    max_connections: usize,
    dedup: bool,
}

impl ConnectionStore {
    /// `dedup = true` merges `(A, B)` and `(B, A)` into one edge
    pub fn new(max_connections: usize, dedup: bool) -> Self {
        Self {
            edges: HashMap::new(),
            next_seq: 0,
            max_connections,
            dedup,
        }
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn key_for(&self, source: &str, target: &str) -> EdgeKey {
        if self.dedup {
            EdgeKey::canonical(source, target)
        } else {
            EdgeKey::directed(source, target)
        }
    }

    pub fn admit(&mut self, batch: impl IntoIterator<Item = ConnectionEdge>) -> AdmissionReport {
        let mut report = AdmissionReport::default();

        for edge in batch {
            let key = self.key_for(&edge.source_node, &edge.target_node);

            match self.edges.get_mut(&key) {
                Some(stored) if edge.received_at >= stored.edge.received_at => {
                    trace!("replacing connection {key}");
                    stored.edge = edge;
                    report.replaced += 1;
                }
                Some(_) => {
                    trace!("ignoring out-of-date measurement for {key}");
                    report.ignored += 1;
                }
                None => {
                    trace!("inserting connection {key}");
                    let seq = self.next_seq;
                    self.next_seq += 1;
                    self.edges.insert(key, StoredEdge { edge, seq });
                    report.inserted += 1;
                }
            }
        }

        report.evicted = self.evict_overflow();
        report
    }

    /// Drop the `len - max` oldest edges in one ordered pass
    fn evict_overflow(&mut self) -> Vec<EdgeKey> {
        let overflow = self.edges.len().saturating_sub(self.max_connections);
        if overflow == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<_> = self
            .edges
            .iter()
            .map(|(key, stored)| ((stored.edge.received_at, stored.seq), key))
            .collect();
        candidates.select_nth_unstable_by_key(overflow - 1, |(order, _)| *order);
        candidates.truncate(overflow);
        candidates.sort_unstable_by_key(|(order, _)| *order);

        let evicted: Vec<EdgeKey> = candidates.into_iter().map(|(_, key)| key.clone()).collect();
        for key in &evicted {
            self.edges.remove(key);
        }

        debug!(
            "connection cap {} reached, evicted {} edge(s)",
            self.max_connections,
            evicted.len()
        );
        evicted
    }

    pub fn get(&self, source: &str, target: &str) -> Option<&ConnectionEdge> {
        self.edges
            .get(&self.key_for(source, target))
            .map(|stored| &stored.edge)
    }

    pub fn remove(&mut self, source: &str, target: &str) -> Option<ConnectionEdge> {
        let key = self.key_for(source, target);
        self.edges.remove(&key).map(|stored| stored.edge)
    }

    /// Drop every edge with `node` as either endpoint
    pub fn remove_touching(&mut self, node: &str) -> usize {
        self.retain(|key, _| !key.touches(node))
    }

    /// Keep only edges matching the predicate, returning how many were dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&EdgeKey, &ConnectionEdge) -> bool) -> usize {
        let before = self.edges.len();
        self.edges.retain(|key, stored| keep(key, &stored.edge));
        before - self.edges.len()
    }

    /// Edges in first-insertion order
    pub fn iter_ordered(&self) -> impl Iterator<Item = (&EdgeKey, &ConnectionEdge)> {
        let mut entries: Vec<_> = self.edges.iter().collect();
        entries.sort_by_key(|(_, stored)| stored.seq);
        entries.into_iter().map(|(key, stored)| (key, &stored.edge))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
