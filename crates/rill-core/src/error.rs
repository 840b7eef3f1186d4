//! Unified error types for the rill core.
//!
//! The core deliberately carries a single error enum: everything that can go
//! wrong at this layer is a transport failure of one kind or another. The
//! Listener never catches or reinterprets these; they surface unchanged to
//! whatever drives the event sequence.

use thiserror::Error;

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Binding the listening socket failed.
    #[error("bind failed on port {port}: {reason}")]
    BindFailed {
        /// The port that could not be bound.
        port: u16,
        /// Reason for failure.
        reason: String,
    },

    /// Accepting the next inbound exchange failed.
    #[error("accept failed: {0}")]
    Accept(String),

    /// The peer connection went away mid-response.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// A response head was written after one had already been sent.
    #[error("response head already written")]
    HeadAlreadySent,

    /// The response was written to after it had been terminated.
    #[error("response already terminated")]
    AlreadyEnded,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
