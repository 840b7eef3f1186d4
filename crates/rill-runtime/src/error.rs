//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use rill_core::TransportError;

/// Errors that can occur while running a server.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The serving loop failed at the transport.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
