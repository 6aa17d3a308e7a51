/// Crate-wide result type for transport and data store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors shared by the transport and data store traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport call (send, react, lookup) was rejected by the backend.
    #[error("transport {operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// Subscribing failed or the live event stream terminated.
    #[error("message stream failed: {message}")]
    Connection { message: String },

    /// Operation is not available for this message or in the current state.
    #[error("channel operation unavailable: {message}")]
    Unavailable { message: String },
}

impl Error {
    #[must_use]
    pub fn transport(operation: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            operation,
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn connection(message: impl std::fmt::Display) -> Self {
        Self::Connection {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    /// True for failures of the event stream itself rather than a single call.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
