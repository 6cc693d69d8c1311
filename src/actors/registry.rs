//! RegistryActor - single owner of the collector state
//!
//! ## Architecture
//!
//! All reads and writes go through one task that owns the `Registry`.
//! Commands are processed one at a time, so every upsert, eviction and
//! cascade is atomic with respect to every query.
//!
//! ## Garbage collection
//!
//! GC runs from two places, both rate limited by the registry's own
//! interval:
//! - **Tick**: a background timer fires every GC interval
//! - **Opportunistic**: each command first asks for a sweep if one is due
//!
//! The tick keeps memory bounded even when nobody polls the collector.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, instrument, trace, warn};

use super::messages::{NodeRemoval, RegistryCommand, RegistryStatus};
use crate::clock::{Clock, SystemClock};
use crate::model::NodeSnapshot;
use crate::store::{
    ClusterStats, ConnectionView, IngestReport, NodeView, Registry, RegistrySettings, StoreError,
    StoreResult, SweepReport,
};

/// Capacity of the command channel
const COMMAND_BUFFER: usize = 32;

/// Fallback tick period for a GC interval chrono cannot express as a std duration
const DEFAULT_SWEEP_TICK: std::time::Duration = std::time::Duration::from_secs(60);

pub struct RegistryActor {
    registry: Registry,
    clock: Arc<dyn Clock>,
    command_rx: mpsc::Receiver<RegistryCommand>,
    sweep_tick: std::time::Duration,
}

impl RegistryActor {
    pub fn new(
        settings: RegistrySettings,
        clock: Arc<dyn Clock>,
        command_rx: mpsc::Receiver<RegistryCommand>,
    ) -> Self {
        let sweep_tick = settings
            .gc_interval
            .to_std()
            .ok()
            .filter(|tick| !tick.is_zero())
            .unwrap_or(DEFAULT_SWEEP_TICK);

        Self {
            registry: Registry::new(settings),
            clock,
            command_rx,
            sweep_tick,
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting registry actor (gc tick every {:?})", self.sweep_tick);

        let mut sweep_interval = time::interval_at(Instant::now() + self.sweep_tick, self.sweep_tick);
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = sweep_interval.tick() => {
                    self.sweep_if_due();
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(RegistryCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd),
                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("registry actor stopped");
    }

    fn sweep_if_due(&mut self) -> Option<SweepReport> {
        let report = self.registry.maybe_sweep(self.clock.now());
        if let Some(report) = &report {
            trace!(
                "gc sweep: {} node(s), {} connection(s), {} error(s)",
                report.nodes_removed.len(),
                report.connections_removed,
                report.errors
            );
        }
        report
    }

    fn handle_command(&mut self, cmd: RegistryCommand) {
        if !matches!(cmd, RegistryCommand::Sweep { .. }) {
            self.sweep_if_due();
        }
        let now = self.clock.now();

        match cmd {
            RegistryCommand::Ingest {
                snapshot,
                respond_to,
            } => {
                let result = self.registry.ingest(snapshot, now);
                if let Err(e) = &result {
                    debug!("rejected snapshot: {e}");
                }
                let _ = respond_to.send(result);
            }

            RegistryCommand::ListNodes { respond_to } => {
                let _ = respond_to.send(self.registry.node_views(now));
            }

            RegistryCommand::GetNode { name, respond_to } => {
                let _ = respond_to.send(self.registry.node_view(&name, now));
            }

            RegistryCommand::RemoveNode { name, respond_to } => {
                let result = self
                    .registry
                    .remove_node(&name)
                    .map(|(record, connections_removed)| NodeRemoval {
                        node: record.name,
                        connections_removed,
                    });
                let _ = respond_to.send(result);
            }

            RegistryCommand::ListConnections { respond_to } => {
                let _ = respond_to.send(self.registry.connection_views());
            }

            RegistryCommand::GetConnection {
                source,
                target,
                respond_to,
            } => {
                let _ = respond_to.send(self.registry.connection_view(&source, &target));
            }

            RegistryCommand::GetStats { respond_to } => {
                let _ = respond_to.send(self.registry.stats(now));
            }

            RegistryCommand::Sweep { force, respond_to } => {
                let report = if force {
                    debug!("forced gc sweep requested");
                    Some(self.registry.sweep(now))
                } else {
                    self.sweep_if_due()
                };
                let _ = respond_to.send(report);
            }

            RegistryCommand::GetStatus { respond_to } => {
                let _ = respond_to.send(RegistryStatus {
                    nodes: self.registry.node_count(),
                    connections: self.registry.connection_count(),
                    max_connections: self.registry.max_connections(),
                    last_sweep: self.registry.last_sweep(),
                });
            }

            RegistryCommand::Shutdown => {}
        }
    }
}

/// Handle for talking to the RegistryActor
#[derive(Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Spawn a registry actor on the wall clock
    pub fn spawn(settings: RegistrySettings) -> Self {
        Self::spawn_with_clock(settings, Arc::new(SystemClock))
    }

    /// Spawn a registry actor reading time from `clock`
    pub fn spawn_with_clock(settings: RegistrySettings, clock: Arc<dyn Clock>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

        let actor = RegistryActor::new(settings, clock, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> StoreResult<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(command(tx))
            .await
            .map_err(|_| StoreError::RegistryUnavailable("registry actor has stopped".to_string()))?;

        rx.await
            .map_err(|_| StoreError::RegistryUnavailable("request dropped".to_string()))
    }

    pub async fn ingest(&self, snapshot: NodeSnapshot) -> StoreResult<IngestReport> {
        let result = self
            .request(|respond_to| RegistryCommand::Ingest {
                snapshot,
                respond_to,
            })
            .await?;
        Ok(result?)
    }

    /// All nodes with their derived status, ordered by name
    pub async fn list_nodes(&self) -> StoreResult<Vec<NodeView>> {
        self.request(|respond_to| RegistryCommand::ListNodes { respond_to })
            .await
    }

    pub async fn get_node(&self, name: &str) -> StoreResult<NodeView> {
        let name = name.to_string();
        let view = self
            .request(|respond_to| RegistryCommand::GetNode {
                name: name.clone(),
                respond_to,
            })
            .await?;
        view.ok_or(StoreError::NodeNotFound(name))
    }

    pub async fn remove_node(&self, name: &str) -> StoreResult<NodeRemoval> {
        self.request(|respond_to| RegistryCommand::RemoveNode {
            name: name.to_string(),
            respond_to,
        })
        .await?
    }

    /// Edges whose endpoints both exist, in first-insertion order
    pub async fn list_connections(&self) -> StoreResult<Vec<ConnectionView>> {
        self.request(|respond_to| RegistryCommand::ListConnections { respond_to })
            .await
    }

    pub async fn get_connection(&self, source: &str, target: &str) -> StoreResult<ConnectionView> {
        let view = self
            .request(|respond_to| RegistryCommand::GetConnection {
                source: source.to_string(),
                target: target.to_string(),
                respond_to,
            })
            .await?;
        view.ok_or_else(|| StoreError::ConnectionNotFound {
            source: source.to_string(),
            target: target.to_string(),
        })
    }

    pub async fn stats(&self) -> StoreResult<ClusterStats> {
        self.request(|respond_to| RegistryCommand::GetStats { respond_to })
            .await
    }

    /// Run GC now if due, or unconditionally with `force`
    pub async fn sweep(&self, force: bool) -> StoreResult<Option<SweepReport>> {
        self.request(|respond_to| RegistryCommand::Sweep { force, respond_to })
            .await
    }

    pub async fn status(&self) -> StoreResult<RegistryStatus> {
        self.request(|respond_to| RegistryCommand::GetStatus { respond_to })
            .await
    }

    /// Shutdown the registry actor
    pub async fn shutdown(&self) {
        let _ = self.sender.send(RegistryCommand::Shutdown).await;
    }
}
