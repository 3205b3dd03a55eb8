//! Fork/branch trace recorder
//!
//! One [`Tracer`] records one logical loop. Each iteration starts with
//! [`Tracer::fork`], which opens a new generation and returns the root
//! [`Scope`]. Nested scopes are opened with `branch`/`timer` and must close in
//! strict reverse order.
//!
//! ```
//! use vantage_trace::TraceRegistry;
//!
//! let registry = TraceRegistry::new();
//! let tracer = registry.create(0, "frame").unwrap();
//!
//! for i in 0..3 {
//!     let root = tracer.fork("frame", 0);
//!     {
//!         let _update = root.timer("update");
//!         root.branch_with("index", i);
//!     }
//! }
//! assert_eq!(tracer.fence(), 3);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::trace;

use crate::node::{NodeFlags, NodeTable};
use crate::registry::RegistryInner;
use crate::snapshot::{self, RecycleSlot, Snapshot, SnapshotFuture};
use crate::value::TraceValue;

/// Name of the optional bookkeeping subtree under each root
pub const INTERNALS_NODE: &str = "[[internals]]";

/// Mutable recorder state, guarded by the tracer lock
#[derive(Default)]
struct TracerState {
    table: NodeTable,
    /// Hashes of open scopes, innermost last
    stack: Vec<u64>,
    fence_active: u64,
    fence_latest: u64,
    order_active: usize,
    interval_counter: usize,
    pending: Option<watch::Sender<Option<Arc<Snapshot>>>>,
    last_fork: Option<Instant>,
    thread: Option<ThreadId>,
}

impl TracerState {
    /// Visit `(parent, name)` in the active generation
    fn touch(&mut self, parent: Option<u64>, name: &str) -> u64 {
        let order = self.order_active;
        self.order_active += 1;
        self.table.visit(parent, name, self.fence_active, order)
    }

    fn set(&mut self, hash: u64, value: TraceValue) {
        if let Some(node) = self.table.get_mut(hash) {
            node.data = value;
        }
    }
}

/// Per-loop trace recorder
///
/// Created through [`crate::TraceRegistry::create`]; dropping the last
/// reference removes it from the registry.
pub struct Tracer {
    id: u64,
    order: i32,
    name: Arc<str>,
    birth: Instant,
    epoch: SystemTime,
    internals: AtomicBool,
    state: Mutex<TracerState>,
    recycle: Arc<RecycleSlot>,
    registry: Weak<RegistryInner>,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("id", &self.id)
            .field("order", &self.order)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Tracer {
    pub(crate) fn new(id: u64, order: i32, name: &str, registry: Weak<RegistryInner>) -> Self {
        Self {
            id,
            order,
            name: Arc::from(name),
            birth: Instant::now(),
            epoch: SystemTime::now(),
            internals: AtomicBool::new(false),
            state: Mutex::new(TracerState::default()),
            recycle: Arc::default(),
            registry,
        }
    }

    /// Registry-assigned creation id
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Sort key among tracers
    #[inline]
    pub fn order(&self) -> i32 {
        self.order
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wall-clock creation time
    #[inline]
    pub fn epoch(&self) -> SystemTime {
        self.epoch
    }

    /// Active generation (0 before the first fork)
    pub fn fence(&self) -> u64 {
        self.state.lock().fence_active
    }

    /// Number of distinct nodes ever created
    pub fn node_count(&self) -> usize {
        self.state.lock().table.len()
    }

    /// Record an `[[internals]]` subtree (age, interval, sequence, branches)
    /// under every root from the next fork on
    pub fn set_internals(&self, enabled: bool) {
        self.internals.store(enabled, Ordering::Relaxed);
    }

    /// Start a new generation and open its root scope
    ///
    /// Delivers a pending snapshot of the finished generation first. With
    /// `interval > 1` only every `interval`-th call starts a generation; the
    /// others return an inert scope.
    pub fn fork(&self, name: &str, interval: usize) -> Scope<'_> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let last_fork = state.last_fork.replace(now);

        if state.fence_active > state.fence_latest {
            self.deliver(&mut state);
        }

        if interval > 1 {
            state.interval_counter += 1;
            if state.interval_counter < interval {
                return Scope::inert();
            }
            state.interval_counter = 0;
        }

        state.thread = Some(thread::current().id());
        state.fence_active += 1;
        state.order_active = 0;
        state.stack.clear();

        let root = state.touch(None, name);
        state.stack.push(root);

        if self.internals.load(Ordering::Relaxed) {
            self.record_internals(&mut state, root, now, last_fork);
        }

        self.scope(&state, None, root, None)
    }

    /// Open a child of the innermost open scope
    ///
    /// Returns an inert scope if no generation is active.
    pub fn branch(&self, name: &str) -> Scope<'_> {
        self.open_under_top(name, None)
    }

    /// Like [`Tracer::branch`], recording elapsed time when the scope closes
    pub fn timer(&self, name: &str) -> Scope<'_> {
        self.open_under_top(name, Some(Instant::now()))
    }

    /// Open a child of the innermost scope and set its value
    pub fn branch_with(&self, name: &str, value: impl Into<TraceValue>) -> Scope<'_> {
        let scope = self.branch(name);
        scope.set(value);
        scope
    }

    /// Ask for a snapshot of the next finished generation
    ///
    /// Requests made before delivery share the same pending export.
    pub fn request_snapshot(&self) -> SnapshotFuture {
        let mut state = self.state.lock();
        let sender = state
            .pending
            .get_or_insert_with(|| watch::channel(None).0);
        SnapshotFuture::new(sender.subscribe())
    }

    /// Apply remote fold/subscribe toggles to the node with `hash`
    ///
    /// Returns false if no such node exists.
    pub fn control(&self, hash: u64, fold: Option<bool>, subscribe: Option<bool>) -> bool {
        let Some(flags) = self.flags(hash) else {
            return false;
        };
        if let Some(fold) = fold {
            flags.set_folded(fold);
        }
        if let Some(subscribe) = subscribe {
            flags.set_subscribed(subscribe);
        }
        true
    }

    /// Control flags of the node with `hash`
    pub fn flags(&self, hash: u64) -> Option<Arc<NodeFlags>> {
        self.state
            .lock()
            .table
            .get(hash)
            .map(|node| Arc::clone(&node.flags))
    }

    fn open_under_top(&self, name: &str, started: Option<Instant>) -> Scope<'_> {
        let mut state = self.state.lock();
        let Some(&parent) = state.stack.last() else {
            return Scope::inert();
        };
        self.open(&mut state, parent, name, started)
    }

    fn open(
        &self,
        state: &mut TracerState,
        parent: u64,
        name: &str,
        started: Option<Instant>,
    ) -> Scope<'_> {
        let current = thread::current().id();
        assert!(
            state.thread == Some(current),
            "tracer '{}' branched from a thread other than the one that forked it",
            self.name
        );

        let hash = state.touch(Some(parent), name);
        state.stack.push(hash);
        self.scope(state, Some(parent), hash, started)
    }

    fn scope(
        &self,
        state: &TracerState,
        parent: Option<u64>,
        hash: u64,
        started: Option<Instant>,
    ) -> Scope<'_> {
        let flags = state
            .table
            .get(hash)
            .map(|node| Arc::clone(&node.flags))
            .unwrap_or_default();

        Scope {
            live: Some(LiveScope {
                tracer: self,
                parent,
                hash,
                fence: state.fence_active,
                started,
                flags,
            }),
        }
    }

    fn record_internals(
        &self,
        state: &mut TracerState,
        root: u64,
        now: Instant,
        last_fork: Option<Instant>,
    ) {
        let internals = state.touch(Some(root), INTERNALS_NODE);
        state.set(internals, format!("{:?}", thread::current().id()).into());

        let age = state.touch(Some(internals), "age");
        state.set(age, now.duration_since(self.birth).into());

        let interval = state.touch(Some(internals), "interval");
        let elapsed = last_fork.map_or(Duration::ZERO, |t| now.duration_since(t));
        state.set(interval, elapsed.into());

        let sequence = state.touch(Some(internals), "sequence");
        state.set(sequence, state.fence_active.into());

        let branches = state.touch(Some(internals), "branches");
        state.set(branches, state.table.len().into());
    }

    /// Export the finished generation to a waiting consumer
    fn deliver(&self, state: &mut TracerState) {
        let Some(pending) = state.pending.take() else {
            return;
        };
        if pending.receiver_count() == 0 {
            return;
        }

        let mut records = std::mem::take(&mut *self.recycle.lock());
        snapshot::export(&state.table, &mut records);
        trace!(
            tracer = %self.name,
            fence = state.fence_active,
            records = records.len(),
            "snapshot delivered"
        );

        let snapshot = Snapshot::new(
            Arc::clone(&self.name),
            state.fence_active,
            records,
            Arc::downgrade(&self.recycle),
        );
        pending.send_replace(Some(Arc::new(snapshot)));
        state.fence_latest = state.fence_active;
    }

    /// Close the scope identified by `live`
    fn close(&self, live: LiveScope<'_>) {
        let mut state = self.state.lock();
        if state.fence_active != live.fence {
            return;
        }

        if state.stack.last() != Some(&live.hash) {
            let name = state
                .table
                .get(live.hash)
                .map(|node| node.name.to_string())
                .unwrap_or_default();
            drop(state);
            if !thread::panicking() {
                panic!("trace scope '{name}' of tracer '{}' closed out of order", self.name);
            }
            return;
        }

        state.stack.pop();
        if let Some(started) = live.started {
            state.set(live.hash, TraceValue::Duration(started.elapsed()));
        }
    }
}

impl Drop for Tracer {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.order, self.id, &self.name);
        }
    }
}

struct LiveScope<'t> {
    tracer: &'t Tracer,
    parent: Option<u64>,
    hash: u64,
    fence: u64,
    started: Option<Instant>,
    flags: Arc<NodeFlags>,
}

/// An open trace node
///
/// Closing (dropping) pops the node from its tracer's stack and, for timers,
/// stores the elapsed time. Scopes must close in strict reverse order of
/// opening; violating that panics. Scopes from a generation that has since
/// been replaced by a newer `fork` close silently.
///
/// Inert scopes (sampled-out forks, branches with nothing open) accept every
/// call and record nothing.
#[must_use = "a scope closes as soon as it is dropped"]
pub struct Scope<'t> {
    live: Option<LiveScope<'t>>,
}

impl<'t> Scope<'t> {
    fn inert() -> Self {
        Self { live: None }
    }

    /// Whether this scope records anything
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.live.is_some()
    }

    /// Node hash (the remote control key)
    #[inline]
    pub fn hash(&self) -> Option<u64> {
        self.live.as_ref().map(|live| live.hash)
    }

    /// Whether a remote observer subscribed to this node
    #[inline]
    pub fn is_subscribed(&self) -> bool {
        self.live.as_ref().is_some_and(|live| live.flags.is_subscribed())
    }

    /// Subscribe or unsubscribe locally
    pub fn subscribe(&self, enabled: bool) {
        if let Some(live) = &self.live {
            live.flags.set_subscribed(enabled);
        }
    }

    /// Set the node value
    pub fn set(&self, value: impl Into<TraceValue>) {
        let Some(live) = &self.live else {
            return;
        };
        let mut state = live.tracer.state.lock();
        if state.fence_active == live.fence {
            state.set(live.hash, value.into());
        }
    }

    /// Open a child of this scope
    pub fn branch(&self, name: &str) -> Scope<'t> {
        self.open_child(name, None)
    }

    /// Open a timed child of this scope
    pub fn timer(&self, name: &str) -> Scope<'t> {
        self.open_child(name, Some(Instant::now()))
    }

    /// Open a child of this scope and set its value
    pub fn branch_with(&self, name: &str, value: impl Into<TraceValue>) -> Scope<'t> {
        let child = self.branch(name);
        child.set(value);
        child
    }

    /// Close this scope and reopen it as a timed sibling named `name`
    pub fn switch_to_timer(&mut self, name: &str) {
        let Some(live) = self.live.take() else {
            return;
        };
        let tracer = live.tracer;
        let parent = live.parent;
        let fence = live.fence;
        tracer.close(live);

        let mut state = tracer.state.lock();
        if state.fence_active != fence {
            return;
        }
        let started = Some(Instant::now());
        *self = match parent {
            Some(parent) => tracer.open(&mut state, parent, name, started),
            None => {
                let hash = state.touch(None, name);
                state.stack.push(hash);
                tracer.scope(&state, None, hash, started)
            }
        };
    }

    fn open_child(&self, name: &str, started: Option<Instant>) -> Scope<'t> {
        let Some(live) = &self.live else {
            return Scope::inert();
        };
        let tracer = live.tracer;
        let mut state = tracer.state.lock();
        if state.fence_active != live.fence {
            return Scope::inert();
        }
        tracer.open(&mut state, live.hash, name, started)
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            let tracer = live.tracer;
            tracer.close(live);
        }
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.live {
            Some(live) => f
                .debug_struct("Scope")
                .field("tracer", &live.tracer.name)
                .field("hash", &live.hash)
                .field("fence", &live.fence)
                .finish(),
            None => f.write_str("Scope(inert)"),
        }
    }
}

#[cfg(test)]
#[path = "tracer_test.rs"]
mod tests;
