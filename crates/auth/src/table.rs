//! Credential table for login validation
//!
//! Built once from a credential string and never mutated afterwards:
//!
//! ```text
//! admin:s3cret:w;viewer:guest:r
//! ```
//!
//! Passwords are never stored. Each entry keeps the bearer token a client is
//! expected to present, `base64(sha256(password))`.
//!
//! # Security
//!
//! Token validation compares against every entry in constant time.

use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::info;

use crate::error::{AuthError, Result};

/// Permission granted to an authenticated connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Commands from this client are dispatched
    ReadWrite,
    /// Client only receives broadcasts; its input is discarded
    ReadOnly,
}

impl Access {
    /// Parse an access field: anything starting with `w`/`W` is read-write
    #[inline]
    pub fn from_field(field: &str) -> Self {
        match field.as_bytes().first() {
            Some(b'w' | b'W') => Self::ReadWrite,
            _ => Self::ReadOnly,
        }
    }

    /// Lowercase name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadWrite => "read-write",
            Self::ReadOnly => "readonly",
        }
    }
}

/// One credential
#[derive(Debug, Clone)]
pub struct AuthEntry {
    /// Display id
    id: String,
    /// Derived bearer token
    token: String,
    /// Granted access
    access: Access,
}

impl AuthEntry {
    /// Create an entry from a display id and raw password
    pub fn new(id: impl Into<String>, password: &str, access: Access) -> Self {
        Self {
            id: id.into(),
            token: derive_token(password),
            access,
        }
    }

    /// Display id
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Bearer token a client must present
    #[inline]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Granted access
    #[inline]
    pub fn access(&self) -> Access {
        self.access
    }
}

/// Derive the bearer token for a password
///
/// `base64(sha256(password))`, standard alphabet with padding.
pub fn derive_token(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    STANDARD.encode(digest)
}

/// Immutable credential table
#[derive(Debug, Clone, Default)]
pub struct AuthTable {
    entries: Vec<AuthEntry>,
}

impl AuthTable {
    /// Create a table from prepared entries, rejecting duplicate ids
    pub fn from_entries(entries: Vec<AuthEntry>) -> Result<Self> {
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.id == entry.id) {
                return Err(AuthError::duplicate_id(&entry.id));
            }
        }

        for entry in &entries {
            info!(id = %entry.id, access = entry.access.as_str(), "adding auth entry");
        }
        Ok(Self { entries })
    }

    /// Parse a credential string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (index, raw) in s.split(';').enumerate() {
            let entry_num = index + 1;
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            entries.push(parse_entry(raw, entry_num)?);
        }

        Self::from_entries(entries)
    }

    /// Validate a bearer token
    ///
    /// Every entry is compared so timing does not depend on which entry
    /// matched. Returns `None` if no entry matches.
    pub fn validate(&self, token: &str) -> Option<&AuthEntry> {
        let token = token.as_bytes();
        let mut found = None;

        for entry in &self.entries {
            if bool::from(entry.token.as_bytes().ct_eq(token)) {
                found = Some(entry);
            }
        }

        found
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &AuthEntry> {
        self.entries.iter()
    }
}

impl FromStr for AuthTable {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Parse one `<id>:<password>:<access>` entry
fn parse_entry(raw: &str, entry_num: usize) -> Result<AuthEntry> {
    let mut parts = raw.splitn(3, ':');

    let id = parts.next().unwrap_or_default().trim();
    if id.is_empty() {
        return Err(AuthError::parse_error(entry_num, "empty id"));
    }

    let password = parts
        .next()
        .ok_or_else(|| AuthError::parse_error(entry_num, "missing password"))?;
    let access = parts
        .next()
        .ok_or_else(|| AuthError::parse_error(entry_num, "missing access"))?;

    Ok(AuthEntry::new(id, password, Access::from_field(access.trim())))
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
