//! API shared state

use chrono::{DateTime, Utc};

use crate::actors::RegistryHandle;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Handle to the registry actor for every read and write
    pub registry: RegistryHandle,

    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(registry: RegistryHandle) -> Self {
        Self {
            registry,
            started_at: Utc::now(),
        }
    }
}
