//! Vantage Routing - Route key to handler dispatch
//!
//! Every received envelope names a route. The [`RouteTable`] maps that name to
//! the handler registered at startup.
//!
//! # Design
//!
//! - Routes are fixed once registered; a second registration panics
//! - Handlers are typed through [`vantage_protocol::Message`]
//! - Unknown routes and bad payloads are logged and dropped, never fatal
//!
//! # Example
//!
//! ```
//! use vantage_protocol::{Envelope, PushCommand};
//! use vantage_routing::RouteTable;
//!
//! let table = RouteTable::new();
//! table.on(|cmd: PushCommand| println!("command: {}", cmd.command));
//!
//! let env = Envelope::new("cmd:push_command", 0, serde_json::json!({"command": "ls"}));
//! assert!(table.dispatch(&env));
//! ```

mod error;
mod table;

pub use error::{Result, RoutingError};
pub use table::{Handler, RouteTable};
