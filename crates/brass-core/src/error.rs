//! Error types shared by transports and the outbound send path.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {addr} - {reason}")]
    ConnectionFailed {
        /// The address that failed to connect.
        addr: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connection closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Nothing was received before the idle deadline expired.
    #[error("no data received for {secs}s")]
    IdleTimeout {
        /// The idle deadline in seconds.
        secs: u64,
    },

    /// The backend rejected the bot's nickname as invalid. Fatal.
    #[error("backend rejected nickname '{nick}': {reason}")]
    InvalidNickname {
        /// The rejected nickname.
        nick: String,
        /// Reason given by the backend.
        reason: String,
    },

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// No transport with the given name is registered.
    #[error("transport '{0}' not found")]
    UnknownTransport(String),

    /// Invalid configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Returns true if the error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidNickname { .. } | Self::InvalidConfig(_))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
