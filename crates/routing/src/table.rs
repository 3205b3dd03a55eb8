//! Route table mapping route keys to handlers
//!
//! Routes are registered once at startup and never replaced. Lookups take a
//! shared lock only long enough to clone the handler; the handler itself runs
//! without any lock held.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{trace, warn};
use vantage_protocol::{Envelope, Message};

use crate::error::{Result, RoutingError};

/// Type-erased route handler
pub type Handler = Arc<dyn Fn(&Envelope) -> Result<()> + Send + Sync>;

/// Thread-safe route table
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use vantage_protocol::{Envelope, PushCommand};
/// use vantage_routing::RouteTable;
///
/// let table = RouteTable::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&hits);
/// table.on(move |_cmd: PushCommand| {
///     counter.fetch_add(1, Ordering::Relaxed);
/// });
///
/// let env = Envelope::new("cmd:push_command", 1, serde_json::json!({"command": "ls"}));
/// assert!(table.dispatch(&env));
/// assert_eq!(hits.load(Ordering::Relaxed), 1);
/// ```
#[derive(Default)]
pub struct RouteTable {
    routes: RwLock<HashMap<String, Handler>>,
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes())
            .finish()
    }
}

impl RouteTable {
    /// Create an empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw handler
    ///
    /// # Panics
    ///
    /// Panics if `route` already has a handler.
    pub fn register<F>(&self, route: impl Into<String>, handler: F)
    where
        F: Fn(&Envelope) -> Result<()> + Send + Sync + 'static,
    {
        let route = route.into();
        let mut routes = self.routes.write();
        assert!(
            !routes.contains_key(&route),
            "route '{route}' registered twice"
        );
        routes.insert(route, Arc::new(handler));
    }

    /// Register a typed handler for `M::ROUTE`
    ///
    /// The payload is parsed before the handler runs; parse failures are
    /// reported by [`RouteTable::dispatch`] and the handler is not called.
    ///
    /// # Panics
    ///
    /// Panics if the route already has a handler.
    pub fn on<M, F>(&self, handler: F)
    where
        M: Message,
        F: Fn(M) + Send + Sync + 'static,
    {
        self.register(M::ROUTE, move |envelope| {
            let message = envelope
                .parse::<M>()
                .map_err(|e| RoutingError::payload(M::ROUTE, e))?;
            handler(message);
            Ok(())
        });
    }

    /// Dispatch an envelope, returning the error instead of logging it
    pub fn try_dispatch(&self, envelope: &Envelope) -> Result<()> {
        let handler = self.routes.read().get(&envelope.route).cloned();
        match handler {
            Some(handler) => handler(envelope),
            None => Err(RoutingError::unknown_route(&envelope.route)),
        }
    }

    /// Dispatch an envelope to its handler
    ///
    /// Unknown routes and malformed payloads are logged and dropped. Returns
    /// whether a handler ran to completion.
    pub fn dispatch(&self, envelope: &Envelope) -> bool {
        match self.try_dispatch(envelope) {
            Ok(()) => {
                trace!(route = %envelope.route, fence = envelope.fence, "dispatched");
                true
            }
            Err(RoutingError::UnknownRoute { route }) => {
                warn!(route = %route, "invalid route");
                false
            }
            Err(e) => {
                warn!(route = %envelope.route, error = %e, "failed to handle message");
                false
            }
        }
    }

    /// Whether `route` has a handler
    #[inline]
    pub fn contains(&self, route: &str) -> bool {
        self.routes.read().contains_key(route)
    }

    /// Number of registered routes
    #[inline]
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    /// Whether no routes are registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }

    /// Registered route keys, sorted
    pub fn routes(&self) -> Vec<String> {
        let mut routes: Vec<String> = self.routes.read().keys().cloned().collect();
        routes.sort();
        routes
    }
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
