pub mod actors;
pub mod agent;
#[cfg(feature = "api")]
pub mod api;
pub mod clock;
pub mod config;
pub mod model;
pub mod store;
pub mod util;

pub use model::{LatencyMeasurement, NodeMetrics, NodeSnapshot, SelfReportedStatus, SystemInfo};
