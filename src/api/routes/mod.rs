//! HTTP handlers, one module per resource

pub mod connections;
pub mod gc;
pub mod health;
pub mod nodes;
pub mod stats;
