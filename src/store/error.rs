//! Error types for registry operations

use std::fmt;

use chrono::{DateTime, Utc};

/// Result type alias for registry operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the registry
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Ingest payload rejected before touching any state
    Validation(ValidationError),

    /// No node record with this name
    NodeNotFound(String),

    /// No connection edge for this pair
    ConnectionNotFound { source: String, target: String },

    /// The registry actor has stopped or dropped the request
    RegistryUnavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Validation(err) => write!(f, "invalid payload: {}", err),
            StoreError::NodeNotFound(name) => write!(f, "node {} not found", name),
            StoreError::ConnectionNotFound { source, target } => {
                write!(f, "connection {} <-> {} not found", source, target)
            }
            StoreError::RegistryUnavailable(msg) => write!(f, "registry unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Validation(err)
    }
}

/// Reasons an ingest payload is rejected
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required string field is empty or whitespace
    EmptyField(&'static str),

    /// Node name contains characters outside the allowed set
    InvalidName(String),

    /// Only one of `lat`/`lon` was given
    IncompleteCoordinates,

    /// Numeric field outside its allowed range
    OutOfRange { field: &'static str, value: f64 },

    /// NaN or infinite value
    NotFinite(&'static str),

    /// A node reported a latency measurement to itself
    SelfConnection(String),

    /// Latency statistics are inconsistent (`min <= avg <= max` violated)
    InconsistentLatency { target: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "field '{}' must not be empty", field),
            ValidationError::InvalidName(name) => write!(f, "invalid node name '{}'", name),
            ValidationError::IncompleteCoordinates => {
                write!(f, "'lat' and 'lon' must be given together")
            }
            ValidationError::OutOfRange { field, value } => {
                write!(f, "field '{}' out of range: {}", field, value)
            }
            ValidationError::NotFinite(field) => write!(f, "field '{}' must be finite", field),
            ValidationError::SelfConnection(name) => {
                write!(f, "node '{}' reported a connection to itself", name)
            }
            ValidationError::InconsistentLatency { target } => write!(
                f,
                "latency to '{}' violates min <= avg <= max",
                target
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Failure evaluating a single record during a GC sweep
///
/// Never aborts a sweep: the record is kept and the sweep moves on.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepError {
    /// Record is stamped later than the sweep's "now"
    FutureTimestamp {
        key: String,
        received_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::FutureTimestamp {
                key,
                received_at,
                now,
            } => write!(
                f,
                "record {} received at {} which is after sweep time {}",
                key, received_at, now
            ),
        }
    }
}

impl std::error::Error for SweepError {}
