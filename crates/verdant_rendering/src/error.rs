//! # Render Error Types
//!
//! Nothing in here aborts a frame. Each variant maps to a degradation the
//! orchestrator applies to a single entity, except the configuration
//! variants which only surface at startup.

use thiserror::Error;
use verdant_shared::{EntityKey, RecordError};

/// Errors that can occur in the population renderer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A pool or buffer had no room left.
    #[error("{resource} exhausted: capacity {capacity}")]
    ResourceExhausted {
        /// Which resource ran out.
        resource: &'static str,
        /// Its fixed capacity.
        capacity: usize,
    },

    /// The detail factory could not build or rebuild a renderer.
    #[error("failed to construct detailed renderer for {key}: {reason}")]
    ConstructionFailure {
        /// Entity the renderer was meant for.
        key: EntityKey,
        /// Factory-provided reason.
        reason: String,
    },

    /// A snapshot record could not be normalized.
    #[error("malformed snapshot record: {0}")]
    MalformedRecord(#[from] RecordError),

    /// A slot or handle was referenced after it was released.
    #[error("stale reference to {0}")]
    StaleReference(EntityKey),

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("configuration I/O: {0}")]
    ConfigIo(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;
