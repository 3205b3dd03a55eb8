//! Error types for the terminal crate

use std::io;

use thiserror::Error;
use vantage_auth::AuthError;
use vantage_protocol::ProtocolError;

/// Errors raised by the dispatcher and terminal
#[derive(Debug, Error)]
pub enum TerminalError {
    /// Socket or thread I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Listener could not be bound
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Message could not be framed or serialized
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Credential string rejected
    #[error("invalid credentials: {0}")]
    Auth(#[from] AuthError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TerminalError {
    /// Create a bind error
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type for terminal operations
pub type Result<T> = std::result::Result<T, TerminalError>;
