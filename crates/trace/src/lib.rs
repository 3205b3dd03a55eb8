//! Vantage Trace - Hierarchical per-loop trace recorder
//!
//! Application code opens named scopes inside a [`Tracer`]; every scope is a
//! node in a tree keyed by a content hash of its path. Each loop iteration
//! starts a new generation with [`Tracer::fork`]. Nodes persist across
//! generations, so the same path always maps to the same node.
//!
//! # Architecture
//!
//! ```text
//! TraceRegistry ──weak──► Tracer ──► NodeTable (hash → node)
//!                           │
//!        fork/branch/timer  │  request_snapshot()
//!        (producer thread)  │  (any thread)
//!                           ▼
//!                 SnapshotFuture ◄── delivered at next fork
//! ```
//!
//! # Concurrency
//!
//! A tracer is recorded from one thread at a time (the one that forked the
//! active generation). Consumers on other threads request snapshots and
//! toggle node flags; the export copy is the only point where they contend
//! with the producer.

mod error;
pub mod hash;
mod node;
mod registry;
mod snapshot;
mod tracer;
mod value;

pub use error::{Result, TraceError};
pub use node::NodeFlags;
pub use registry::TraceRegistry;
pub use snapshot::{Snapshot, SnapshotFuture, TraceRecord};
pub use tracer::{INTERNALS_NODE, Scope, Tracer};
pub use value::{ImageRef, TraceValue};
