//! Vantage Auth - Credential table for terminal logins
//!
//! Clients authenticate with a bearer token derived from a shared password.
//! Each credential grants either read-write access (commands are dispatched)
//! or read-only access (the client only observes).
//!
//! # Credential string
//!
//! ```text
//! <id>:<password>:<access>[;<id>:<password>:<access>...]
//! ```
//!
//! `access` starting with `w`/`W` grants read-write; anything else is read-only.
//!
//! # Example
//!
//! ```
//! use std::str::FromStr;
//! use vantage_auth::{AuthTable, derive_token};
//!
//! let table = AuthTable::from_str("admin:pw:w;guest:hello:r").unwrap();
//! let entry = table.validate(&derive_token("pw")).unwrap();
//! assert_eq!(entry.id(), "admin");
//! ```

mod error;
mod table;

pub use error::{AuthError, Result};
pub use table::{Access, AuthEntry, AuthTable, derive_token};
