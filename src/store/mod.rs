//! In-memory state engine of the collector
//!
//! This module holds everything the collector knows about the fleet and
//! the rules that keep it consistent.
//!
//! ## Layout
//!
//! - **record**: `NodeRecord`, `ConnectionEdge` and edge keys
//! - **liveness**: derives `online` / `warning` / `offline` at read time
//! - **connections**: edge store with dedup and capacity eviction
//! - **gc**: rate-limited sweep of stale records, cascading to edges
//! - **stats**: cluster rollups
//! - **registry**: the single owner tying the above together
//!
//! ## Volatility
//!
//! Nothing here is persisted. A collector restart starts from an empty
//! registry and fills up again as agents report.

pub mod connections;
pub mod error;
pub mod gc;
pub mod liveness;
pub mod record;
pub mod registry;
pub mod stats;
pub mod view;

pub use error::{StoreError, StoreResult, SweepError, ValidationError};
pub use gc::SweepReport;
pub use liveness::NodeStatus;
pub use record::{ConnectionEdge, EdgeKey, NodeRecord};
pub use registry::{IngestReport, Registry, RegistrySettings};
pub use stats::ClusterStats;
pub use view::{ConnectionView, NodeView};
