//! Publishers driven by the terminal worker
//!
//! Each watcher turns one local data source into outbound messages:
//!
//! - [`ConfigWatcher`]: config registries and their dirty entities
//! - [`TraceWatcher`]: the tracer class list and fetched trace trees
//! - [`SystemWatcher`]: periodic process telemetry

mod config;
mod system;
mod trace;

pub use config::ConfigWatcher;
pub use system::SystemWatcher;
pub use trace::{PendingFetches, TraceWatcher, build_trees, wire_value};
