//! Route envelope carried in every frame body
//!
//! ```json
//! {"route": "update:traces", "fence": 17, "payload": { ... }}
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, Result};
use crate::frame::encode_frame;
use crate::message::Message;

/// A routed message: route key, sender sequence and route-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Route key selecting the handler on the receiving side
    pub route: String,
    /// Monotonic sequence assigned by the sender
    #[serde(default)]
    pub fence: i64,
    /// Route-specific body
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Create an envelope from raw parts
    pub fn new(route: impl Into<String>, fence: i64, payload: Value) -> Self {
        Self {
            route: route.into(),
            fence,
            payload,
        }
    }

    /// Wrap a typed message
    pub fn from_message<M: Message>(fence: i64, message: &M) -> Result<Self> {
        Ok(Self::new(M::ROUTE, fence, serde_json::to_value(message)?))
    }

    /// Decode an envelope from a frame body
    pub fn decode(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Serialize to a frame body (no header)
    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Serialize to a complete frame ready for the socket
    pub fn encode(&self) -> Result<Bytes> {
        encode_frame(&self.to_body()?)
    }

    /// Check whether this envelope carries `M`
    #[inline]
    pub fn is<M: Message>(&self) -> bool {
        self.route == M::ROUTE
    }

    /// Parse the payload as `M`, checking the route first
    pub fn parse<M: Message>(&self) -> Result<M> {
        if !self.is::<M>() {
            return Err(ProtocolError::unexpected_route(M::ROUTE, &self.route));
        }
        Ok(M::deserialize(&self.payload)?)
    }
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
