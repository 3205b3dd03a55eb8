//! Configuration validation
//!
//! Rejects values the dispatcher or terminal worker cannot run with:
//! - Message ceiling outside what the frame header can express
//! - Zero-length queues or intervals
//! - Empty session name

use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};

/// Largest body length the 3-byte header length field can carry
const MAX_ENCODABLE_SIZE: usize = 1 << 24;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_session(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    let server = &config.server;

    if server.max_message_size == 0 || server.max_message_size > MAX_ENCODABLE_SIZE {
        return Err(ConfigError::invalid_value(
            "server",
            "max_message_size",
            format!("must be between 1 and {MAX_ENCODABLE_SIZE}"),
        ));
    }

    if server.outbound_queue == 0 {
        return Err(ConfigError::invalid_value(
            "server",
            "outbound_queue",
            "must be at least 1",
        ));
    }

    if server.address.trim().is_empty() {
        return Err(ConfigError::missing_field("server", "address"));
    }

    Ok(())
}

fn validate_session(config: &Config) -> Result<()> {
    let session = &config.session;

    if session.name.trim().is_empty() {
        return Err(ConfigError::missing_field("session", "name"));
    }

    for (field, value) in [
        ("state_interval", session.state_interval),
        ("enumerate_interval", session.enumerate_interval),
        ("tick_interval", session.tick_interval),
    ] {
        if value == Duration::ZERO {
            return Err(ConfigError::invalid_value("session", field, "must be non-zero"));
        }
    }

    if session.command_queue == 0 {
        return Err(ConfigError::invalid_value(
            "session",
            "command_queue",
            "must be at least 1",
        ));
    }

    Ok(())
}
