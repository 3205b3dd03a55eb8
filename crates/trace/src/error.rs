//! Error types for the trace engine

use thiserror::Error;

/// Result type for trace operations
pub type Result<T> = std::result::Result<T, TraceError>;

/// Errors raised by tracers and the tracer registry
#[derive(Debug, Error)]
pub enum TraceError {
    /// A live tracer already uses this name
    #[error("tracer '{name}' already exists")]
    DuplicateTracer {
        /// Requested name
        name: String,
    },

    /// The tracer was dropped before the snapshot was delivered
    #[error("snapshot request abandoned")]
    Abandoned,
}

impl TraceError {
    /// Create a DuplicateTracer error
    #[inline]
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateTracer { name: name.into() }
    }
}
