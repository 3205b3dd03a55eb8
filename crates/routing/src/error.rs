//! Routing error types

use thiserror::Error;
use vantage_protocol::ProtocolError;

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors raised while dispatching a received envelope
#[derive(Debug, Error)]
pub enum RoutingError {
    /// No handler registered under this route
    #[error("unknown route '{route}'")]
    UnknownRoute {
        /// Route key from the envelope
        route: String,
    },

    /// Handler found but the payload did not parse
    #[error("invalid payload for route '{route}': {source}")]
    Payload {
        /// Route key from the envelope
        route: String,
        /// Underlying decode error
        #[source]
        source: ProtocolError,
    },
}

impl RoutingError {
    /// Create an UnknownRoute error
    #[inline]
    pub fn unknown_route(route: impl Into<String>) -> Self {
        Self::UnknownRoute {
            route: route.into(),
        }
    }

    /// Create a Payload error
    #[inline]
    pub fn payload(route: impl Into<String>, source: ProtocolError) -> Self {
        Self::Payload {
            route: route.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_route_error() {
        let err = RoutingError::unknown_route("cmd:nope");
        assert!(err.to_string().contains("cmd:nope"));
        assert!(err.to_string().contains("unknown route"));
    }

    #[test]
    fn test_payload_error() {
        let source = ProtocolError::unexpected_route("auth:login", "cmd:x");
        let err = RoutingError::payload("cmd:x", source);
        assert!(err.to_string().contains("cmd:x"));
        assert!(err.to_string().contains("invalid payload"));
    }
}
