//! Vantage Terminal - remote instrumentation front-end
//!
//! Exposes a process' configuration registries, live trace trees and an
//! interactive shell to remote observers over the framed TCP protocol.
//!
//! # Architecture
//!
//! ```text
//!   observers ──TCP──▶ Dispatcher (reactor thread)
//!                        │  Session per socket: login ─▶ active | discarding
//!                        │  RouteTable ─▶ command queue / config store / tracers
//!                        ▼
//!                      ActiveSockets ◀── broadcast ── Terminal worker
//!                                                      ├─ ConfigWatcher
//!                                                      ├─ TraceWatcher
//!                                                      └─ SystemWatcher
//! ```
//!
//! # Example
//!
//! ```ignore
//! let registry = TraceRegistry::new();
//! let store = Arc::new(MemoryConfigStore::new());
//! let terminal = Terminal::new(&Config::default(), registry.clone(), store)?;
//! terminal.launch()?;
//!
//! while let Some(command) = terminal.poll_command(Duration::from_secs(1)) {
//!     terminal.write_shell(&format!("> {command}\n"));
//! }
//! ```

mod commands;
mod config_store;
mod dispatcher;
mod error;
mod metrics;
mod session;
mod shell;
mod socket;
mod terminal;
pub mod watcher;

pub use commands::CommandQueue;
pub use config_store::{ConfigEntityInfo, ConfigStore, MemoryConfigStore, category_tree};
pub use dispatcher::Dispatcher;
pub use error::{Result, TerminalError};
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use session::{Phase, SessionEvent, SessionState};
pub use shell::ShellBuffer;
pub use socket::ActiveSockets;
pub use terminal::Terminal;
