//! Trace node table
//!
//! Nodes are keyed by their content hash and live as long as their tracer.
//! A node is created on the first visit of a (parent, name) pair and is
//! revisited, never recreated, in later generations.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::hash::{child_hash, root_hash};
use crate::value::TraceValue;

/// Remotely controlled node flags
///
/// Shared with scopes so the hot path can check subscription without
/// taking the tracer lock.
#[derive(Debug, Default)]
pub struct NodeFlags {
    subscribed: AtomicBool,
    folded: AtomicBool,
}

impl NodeFlags {
    #[inline]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_subscribed(&self, enabled: bool) {
        self.subscribed.store(enabled, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_folded(&self) -> bool {
        self.folded.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_folded(&self, folded: bool) {
        self.folded.store(folded, Ordering::Relaxed);
    }
}

/// One node of a tracer's forest
#[derive(Debug)]
pub(crate) struct TraceNode {
    pub name: Arc<str>,
    pub hash: u64,
    pub parent: Option<u64>,
    /// Names from root to self
    pub hierarchy: Arc<[Arc<str>]>,
    /// `unique_order` of every node from root to self
    pub lineage: Arc<[usize]>,
    /// Creation index within the table, stable for the tracer's lifetime
    pub unique_order: usize,
    /// Visit index within the generation that last touched the node
    pub active_order: usize,
    /// Generation that last touched the node
    pub fence: u64,
    pub data: TraceValue,
    pub flags: Arc<NodeFlags>,
}

/// Hash-keyed node storage
#[derive(Debug, Default)]
pub(crate) struct NodeTable {
    nodes: HashMap<u64, TraceNode>,
}

impl NodeTable {
    /// Look up or create the node for `(parent, name)` and stamp the visit
    ///
    /// Returns the node hash.
    pub fn visit(&mut self, parent: Option<u64>, name: &str, fence: u64, order: usize) -> u64 {
        let hash = match parent {
            Some(parent) => child_hash(parent, name),
            None => root_hash(name),
        };

        if !self.nodes.contains_key(&hash) {
            let node = self.create(parent, name, hash);
            self.nodes.insert(hash, node);
        }

        if let Some(node) = self.nodes.get_mut(&hash) {
            node.fence = fence;
            node.active_order = order;
        }

        hash
    }

    fn create(&self, parent: Option<u64>, name: &str, hash: u64) -> TraceNode {
        let name: Arc<str> = Arc::from(name);
        let unique_order = self.nodes.len();

        let (mut hierarchy, mut lineage) = match parent.and_then(|p| self.nodes.get(&p)) {
            Some(p) => (p.hierarchy.to_vec(), p.lineage.to_vec()),
            None => (Vec::new(), Vec::new()),
        };
        hierarchy.push(Arc::clone(&name));
        lineage.push(unique_order);

        TraceNode {
            name,
            hash,
            parent,
            hierarchy: hierarchy.into(),
            lineage: lineage.into(),
            unique_order,
            active_order: 0,
            fence: 0,
            data: TraceValue::None,
            flags: Arc::default(),
        }
    }

    #[inline]
    pub fn get(&self, hash: u64) -> Option<&TraceNode> {
        self.nodes.get(&hash)
    }

    #[inline]
    pub fn get_mut(&mut self, hash: u64) -> Option<&mut TraceNode> {
        self.nodes.get_mut(&hash)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceNode> {
        self.nodes.values()
    }

    /// Whether any ancestor of `node` is folded
    pub fn has_folded_ancestor(&self, node: &TraceNode) -> bool {
        let mut cursor = node.parent;
        while let Some(hash) = cursor {
            match self.nodes.get(&hash) {
                Some(ancestor) if ancestor.flags.is_folded() => return true,
                Some(ancestor) => cursor = ancestor.parent,
                None => return false,
            }
        }
        false
    }
}
