//! Error types for the wire protocol

use std::io;
use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while framing, parsing or encoding messages
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Header does not start with the fixed magic bytes
    #[error("bad frame magic: {found:02x?}")]
    BadMagic {
        /// The four bytes actually received
        found: [u8; 4],
    },

    /// Length field is not valid base64
    #[error("malformed frame length: {0}")]
    MalformedLength(String),

    /// Declared body length reaches the configured ceiling
    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge {
        /// Declared or actual body size
        size: usize,
        /// Exclusive upper bound
        limit: usize,
    },

    /// Envelope or payload failed to (de)serialize
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Envelope carried a route other than the one expected
    #[error("expected route '{expected}', got '{found}'")]
    UnexpectedRoute {
        /// Route the caller asked for
        expected: &'static str,
        /// Route found in the envelope
        found: String,
    },

    /// Socket read or write failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Create a FrameTooLarge error
    pub fn too_large(size: usize, limit: usize) -> Self {
        Self::FrameTooLarge { size, limit }
    }

    /// Create an UnexpectedRoute error
    pub fn unexpected_route(expected: &'static str, found: impl Into<String>) -> Self {
        Self::UnexpectedRoute {
            expected,
            found: found.into(),
        }
    }

    /// Whether this error must terminate the connection
    ///
    /// Framing violations and transport faults close the socket; codec and
    /// route mismatches only drop the offending message.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BadMagic { .. } | Self::MalformedLength(_) | Self::FrameTooLarge { .. } | Self::Io(_)
        )
    }
}
