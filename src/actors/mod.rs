//! Actor owning the collector state
//!
//! The registry runs as an independent async task. HTTP handlers never
//! touch the stores directly; they hold a cloneable `RegistryHandle` and
//! talk to the actor over a bounded mpsc channel.
//!
//! ## Architecture Overview
//!
//! ```text
//!   agents ──POST──┐            ┌──GET── dashboards
//!                  ▼            ▼
//!             ┌────────────────────┐
//!             │  axum handlers     │  (many concurrent tasks)
//!             └─────────┬──────────┘
//!                       │ RegistryHandle (mpsc, 32)
//!             ┌─────────▼──────────┐
//!             │  RegistryActor     │◄── gc tick
//!             │   └─ Registry      │
//!             └────────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: one mpsc channel carries every request
//! 2. **Request/Response**: each command embeds a oneshot reply channel

pub mod messages;
pub mod registry;

pub use messages::{NodeRemoval, RegistryCommand, RegistryStatus};
pub use registry::{RegistryActor, RegistryHandle};
