//! Error types for the integration crate.

use thiserror::Error;
use verdant_rendering::RenderError;

/// Errors raised while wiring the renderer to the simulation.
#[derive(Error, Debug)]
pub enum VerdantError {
    /// Renderer setup failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The simulation worker thread could not be started.
    #[error("failed to spawn simulation worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The simulation worker is gone.
    #[error("simulation worker disconnected")]
    Disconnected,

    /// Configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

/// Result type for integration operations.
pub type VerdantResult<T> = Result<T, VerdantError>;
