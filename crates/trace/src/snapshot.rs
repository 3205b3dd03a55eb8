//! Snapshot export and delivery
//!
//! A consumer asks a tracer for a snapshot and receives a [`SnapshotFuture`].
//! Requests made before delivery share one pending export. The export runs on
//! the producer thread at the next `fork`, under the tracer lock, and copies
//! the finished generation into a buffer the tracer reuses once every holder
//! of the resulting [`Snapshot`] has dropped it.

use std::ops::Deref;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{Result, TraceError};
use crate::node::{NodeTable, TraceNode};
use crate::value::TraceValue;

/// Buffer slot shared between a tracer and its snapshots
pub(crate) type RecycleSlot = Mutex<Vec<TraceRecord>>;

/// Point-in-time copy of one trace node
#[derive(Debug, Clone)]
pub struct TraceRecord {
    pub name: Arc<str>,
    /// Node hash, used as the remote control key
    pub hash: u64,
    pub parent: Option<u64>,
    pub hierarchy: Arc<[Arc<str>]>,
    pub unique_order: usize,
    pub active_order: usize,
    /// Generation that last touched the node
    pub fence: u64,
    pub data: TraceValue,
    pub subscribed: bool,
    pub folded: bool,
    lineage: Arc<[usize]>,
}

impl TraceRecord {
    fn capture(node: &TraceNode) -> Self {
        Self {
            name: Arc::clone(&node.name),
            hash: node.hash,
            parent: node.parent,
            hierarchy: Arc::clone(&node.hierarchy),
            unique_order: node.unique_order,
            active_order: node.active_order,
            fence: node.fence,
            data: node.data.clone(),
            subscribed: node.flags.is_subscribed(),
            folded: node.flags.is_folded(),
            lineage: Arc::clone(&node.lineage),
        }
    }

    /// Depth below the root (roots are 0)
    #[inline]
    pub fn depth(&self) -> usize {
        self.hierarchy.len().saturating_sub(1)
    }
}

/// Copy every exportable node of `table` into `out`, hierarchy-sorted
///
/// Descendants of folded nodes are skipped; the folded node itself is kept.
/// The result is in depth-first pre-order: every ancestor precedes its
/// descendants, siblings follow creation order, and each subtree is
/// contiguous.
pub(crate) fn export(table: &NodeTable, out: &mut Vec<TraceRecord>) {
    out.clear();
    out.reserve(table.len());

    for node in table.iter() {
        if table.has_folded_ancestor(node) {
            continue;
        }
        out.push(TraceRecord::capture(node));
    }

    out.sort_unstable_by(|a, b| a.lineage.cmp(&b.lineage));
}

/// Exported generation of one tracer
///
/// Dropping the last reference returns the record buffer to the tracer.
#[derive(Debug)]
pub struct Snapshot {
    tracer: Arc<str>,
    fence: u64,
    records: Vec<TraceRecord>,
    recycle: Weak<RecycleSlot>,
}

impl Snapshot {
    pub(crate) fn new(
        tracer: Arc<str>,
        fence: u64,
        records: Vec<TraceRecord>,
        recycle: Weak<RecycleSlot>,
    ) -> Self {
        Self {
            tracer,
            fence,
            records,
            recycle,
        }
    }

    /// Name of the tracer this came from
    #[inline]
    pub fn tracer(&self) -> &str {
        &self.tracer
    }

    /// Generation the snapshot was taken from
    #[inline]
    pub fn fence(&self) -> u64 {
        self.fence
    }

    /// Whether `record` was touched in the exported generation
    #[inline]
    pub fn is_fresh(&self, record: &TraceRecord) -> bool {
        record.fence == self.fence
    }

    #[inline]
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }
}

impl Deref for Snapshot {
    type Target = [TraceRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        let Some(slot) = self.recycle.upgrade() else {
            return;
        };

        let mut buffer = std::mem::take(&mut self.records);
        buffer.clear();

        let mut slot = slot.lock();
        if buffer.capacity() > slot.capacity() {
            *slot = buffer;
        }
    }
}

/// Pending or delivered snapshot
///
/// Clones observe the same delivery.
#[derive(Debug, Clone)]
pub struct SnapshotFuture {
    rx: watch::Receiver<Option<Arc<Snapshot>>>,
}

impl SnapshotFuture {
    pub(crate) fn new(rx: watch::Receiver<Option<Arc<Snapshot>>>) -> Self {
        Self { rx }
    }

    /// The snapshot, if already delivered
    pub fn try_get(&self) -> Option<Arc<Snapshot>> {
        self.rx.borrow().clone()
    }

    /// Whether the snapshot has been delivered
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Whether the tracer went away without delivering
    pub fn is_abandoned(&self) -> bool {
        !self.is_ready() && self.rx.has_changed().is_err()
    }

    /// Wait for delivery
    ///
    /// # Errors
    ///
    /// Returns `Abandoned` if the tracer is dropped first.
    pub async fn wait(mut self) -> Result<Arc<Snapshot>> {
        let delivered = self
            .rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| TraceError::Abandoned)?;
        delivered.clone().ok_or(TraceError::Abandoned)
    }
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod tests;
