//! Tracer registry
//!
//! The registry is the runtime context that owns the set of live tracers.
//! It holds weak references only: a tracer lives as long as the code that
//! records into it, and removes itself from the registry when dropped.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, TraceError};
use crate::tracer::Tracer;

struct Slot {
    name: Arc<str>,
    tracer: Weak<Tracer>,
}

/// Shared registry state
#[derive(Default)]
pub(crate) struct RegistryInner {
    /// Keyed by (order, creation id) so iteration is already sorted
    slots: RwLock<BTreeMap<(i32, u64), Slot>>,
    next_id: AtomicU64,
}

impl RegistryInner {
    pub(crate) fn remove(&self, order: i32, id: u64, name: &str) {
        if self.slots.write().remove(&(order, id)).is_some() {
            debug!(tracer = %name, "tracer dropped");
        }
    }
}

/// Set of live tracers, ordered by `(order, creation)`
///
/// Cheap to clone; clones share the same set.
#[derive(Clone, Default)]
pub struct TraceRegistry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for TraceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceRegistry")
            .field("tracers", &self.names())
            .finish()
    }
}

impl TraceRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a tracer
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTracer` if a live tracer already has `name`.
    pub fn create(&self, order: i32, name: &str) -> Result<Arc<Tracer>> {
        let mut slots = self.inner.slots.write();

        let taken = slots
            .values()
            .any(|slot| &*slot.name == name && slot.tracer.strong_count() > 0);
        if taken {
            return Err(TraceError::duplicate(name));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let tracer = Arc::new(Tracer::new(id, order, name, Arc::downgrade(&self.inner)));
        slots.insert(
            (order, id),
            Slot {
                name: Arc::from(name),
                tracer: Arc::downgrade(&tracer),
            },
        );

        debug!(tracer = %name, order, id, "tracer created");
        Ok(tracer)
    }

    /// Live tracers sorted by `(order, creation)`
    pub fn all(&self) -> Vec<Arc<Tracer>> {
        let slots = self.inner.slots.read();
        slots.values().filter_map(|slot| slot.tracer.upgrade()).collect()
    }

    /// Find a live tracer by name
    pub fn find(&self, name: &str) -> Option<Arc<Tracer>> {
        let slots = self.inner.slots.read();
        slots
            .values()
            .filter(|slot| &*slot.name == name)
            .find_map(|slot| slot.tracer.upgrade())
    }

    /// Names of live tracers in registry order
    pub fn names(&self) -> Vec<String> {
        let slots = self.inner.slots.read();
        slots
            .values()
            .filter(|slot| slot.tracer.strong_count() > 0)
            .map(|slot| slot.name.to_string())
            .collect()
    }

    /// Number of live tracers
    pub fn len(&self) -> usize {
        let slots = self.inner.slots.read();
        slots
            .values()
            .filter(|slot| slot.tracer.strong_count() > 0)
            .count()
    }

    /// Whether no tracer is alive
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
