//! Authentication error types

use thiserror::Error;

/// Result type for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised while building the credential table
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credential entry is not `<id>:<password>:<access>`
    #[error("invalid credential entry {entry}: {message} (expected <ID>:<PW>:<ACCESS>[;...])")]
    ParseError {
        /// Entry index (1-based)
        entry: usize,
        /// Error message
        message: String,
    },

    /// The same id appears twice
    #[error("duplicate credential id '{id}'")]
    DuplicateId {
        /// Offending id
        id: String,
    },
}

impl AuthError {
    /// Create a ParseError
    pub fn parse_error(entry: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            entry,
            message: message.into(),
        }
    }

    /// Create a DuplicateId error
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }
}
