//! Tracer list and trace tree publisher

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};
use vantage_protocol::{TraceClassList, TraceNodeScheme, TraceUpdate, TraceValueKind};
use vantage_trace::{Snapshot, SnapshotFuture, TraceRecord, TraceRegistry, TraceValue};

use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// Snapshot requests waiting for their tracer's next fork
///
/// Written by the `cmd:signal_fetch_traces` handler, drained by the worker.
#[derive(Debug, Default)]
pub struct PendingFetches {
    pending: Mutex<HashMap<String, SnapshotFuture>>,
}

impl PendingFetches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a snapshot from the tracer named `name`
    ///
    /// Returns false if no such tracer is alive. Repeated requests before
    /// delivery share one export.
    pub fn request(&self, registry: &TraceRegistry, name: &str) -> bool {
        let Some(tracer) = registry.find(name) else {
            debug!(tracer = name, "fetch requested for unknown tracer");
            return false;
        };

        let mut pending = self.pending.lock();
        let stale = pending.get(name).is_none_or(SnapshotFuture::is_abandoned);
        if stale {
            pending.insert(name.to_string(), tracer.request_snapshot());
        }
        true
    }

    /// Remove and return every delivered snapshot; abandoned requests are dropped
    pub fn take_ready(&self) -> Vec<Arc<Snapshot>> {
        let mut pending = self.pending.lock();
        let mut ready = Vec::new();

        pending.retain(|name, future| {
            if let Some(snapshot) = future.try_get() {
                ready.push(snapshot);
                false
            } else if future.is_abandoned() {
                debug!(tracer = %name, "tracer dropped before delivering");
                false
            } else {
                true
            }
        });

        ready
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn clear(&self) {
        self.pending.lock().clear();
    }
}

/// Publishes the tracer list and delivered snapshots
pub struct TraceWatcher {
    registry: TraceRegistry,
    fetches: Arc<PendingFetches>,
    /// Names last published
    names: Vec<String>,
}

impl TraceWatcher {
    pub fn new(registry: TraceRegistry, fetches: Arc<PendingFetches>) -> Self {
        Self {
            registry,
            fetches,
            names: Vec::new(),
        }
    }

    /// Forget the published list and drop outstanding requests
    pub fn reset(&mut self) {
        self.names.clear();
        self.fetches.clear();
    }

    /// Send the tracer list if it changed, or unconditionally with `force`
    pub fn publish_class_list(&mut self, dispatcher: &Dispatcher, force: bool) -> Result<bool> {
        let names = self.registry.names();
        if !force && names == self.names {
            return Ok(false);
        }

        debug!(tracers = names.len(), "publishing tracer list");
        dispatcher.send(&TraceClassList {
            content: names.clone(),
        })?;
        self.names = names;
        Ok(true)
    }

    /// Send every snapshot delivered since the last pass
    ///
    /// Returns the number of trees sent.
    pub fn publish_ready(&mut self, dispatcher: &Dispatcher) -> Result<usize> {
        let mut sent = 0;

        for snapshot in self.fetches.take_ready() {
            trace!(
                tracer = snapshot.tracer(),
                fence = snapshot.fence(),
                records = snapshot.len(),
                "dispatching fetched traces"
            );

            for root in build_trees(&snapshot) {
                dispatcher.send(&TraceUpdate {
                    class_name: snapshot.tracer().to_string(),
                    fence: snapshot.fence(),
                    root,
                })?;
                sent += 1;
            }
        }

        Ok(sent)
    }
}

/// Wire rendering and tag of a trace value
///
/// Durations go out as whole microseconds; a missing value is empty.
pub fn wire_value(value: &TraceValue) -> (String, TraceValueKind) {
    match value {
        TraceValue::None => (String::new(), TraceValueKind::Null),
        TraceValue::Duration(d) => (d.as_micros().to_string(), TraceValueKind::Duration),
        TraceValue::Integer(v) => (v.to_string(), TraceValueKind::Integer),
        TraceValue::Float(v) => (format!("{v:.6}"), TraceValueKind::Float),
        TraceValue::String(s) => (s.clone(), TraceValueKind::String),
        TraceValue::Boolean(b) => (b.to_string(), TraceValueKind::Boolean),
        TraceValue::Image(_) => (value.to_string(), TraceValueKind::Image),
    }
}

fn node_scheme(snapshot: &Snapshot, record: &TraceRecord) -> TraceNodeScheme {
    let (value, value_type) = wire_value(&record.data);
    TraceNodeScheme {
        name: record.name.to_string(),
        trace_key: record.hash,
        is_fresh: snapshot.is_fresh(record),
        subscribing: record.subscribed,
        folded: record.folded,
        value,
        value_type,
        children: Vec::new(),
    }
}

/// Rebuild trees from a hierarchy-sorted snapshot
///
/// Records arrive in depth-first pre-order, so a stack of open ancestors is
/// enough: pop until the top is the record's parent, then push the record.
pub fn build_trees(snapshot: &Snapshot) -> Vec<TraceNodeScheme> {
    let mut roots = Vec::new();
    let mut stack: Vec<(u64, TraceNodeScheme)> = Vec::new();

    for record in snapshot.iter() {
        while stack
            .last()
            .is_some_and(|(hash, _)| Some(*hash) != record.parent)
        {
            close_top(&mut stack, &mut roots);
        }
        stack.push((record.hash, node_scheme(snapshot, record)));
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }
    roots
}

fn close_top(stack: &mut Vec<(u64, TraceNodeScheme)>, roots: &mut Vec<TraceNodeScheme>) {
    let Some((_, node)) = stack.pop() else {
        return;
    };
    match stack.last_mut() {
        Some((_, parent)) => parent.children.push(node),
        None => roots.push(node),
    }
}

#[cfg(test)]
#[path = "trace_test.rs"]
mod tests;
