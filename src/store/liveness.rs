//! Liveness classification
//!
//! Two layers decide what a client sees:
//!
//! 1. The agent's own assessment (`online` or `warning`)
//! 2. The collector's staleness check, which alone may say `offline`
//!
//! Status is never stored; it is derived from `received_at` on every read.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::SelfReportedStatus;

/// Externally visible node status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Warning,
    Offline,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "online",
            NodeStatus::Warning => "warning",
            NodeStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SelfReportedStatus> for NodeStatus {
    fn from(value: SelfReportedStatus) -> Self {
        match value {
            SelfReportedStatus::Online => NodeStatus::Online,
            SelfReportedStatus::Warning => NodeStatus::Warning,
        }
    }
}

/// Offline iff `now - received_at >= timeout`, otherwise whatever the
/// node last reported. No hysteresis in either direction.
pub fn classify(
    reported: SelfReportedStatus,
    received_at: DateTime<Utc>,
    now: DateTime<Utc>,
    timeout: Duration,
) -> NodeStatus {
    if now.signed_duration_since(received_at) >= timeout {
        NodeStatus::Offline
    } else {
        reported.into()
    }
}

/// Human readable age such as `30s ago`, `1m ago` or `3h ago`
pub fn describe_age(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
