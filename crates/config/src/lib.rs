//! Vantage Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid configuration.
//!
//! # Parsing
//!
//! ```
//! use vantage_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[server]\nport = 9000").unwrap();
//! assert_eq!(config.server.port, 9000);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "debug"
//!
//! [server]
//! port = 15572
//! credentials = "admin:s3cret:w;viewer:guest:r"
//!
//! [session]
//! name = "renderer"
//! state_interval = "500ms"
//! ```

mod error;
mod logging;
mod server;
mod session;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use server::{DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_PORT, ServerConfig};
pub use session::SessionConfig;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Listener and connection settings
    pub server: ServerConfig,

    /// Session identity and worker cadence
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.log.level, LogLevel::Info);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.session.name, "vantage");
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_str(
            r#"
[log]
level = "debug"

[server]
address = "127.0.0.1"
port = 0
max_message_size = 4096
credentials = "a:pw:w"
restart_backoff = "100ms"

[session]
name = "renderer"
description = "frame loop"
state_interval = "250ms"
"#,
        )
        .unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.server.bind_address(), "127.0.0.1:0");
        assert_eq!(config.server.max_message_size, 4096);
        assert_eq!(config.server.credentials.as_deref(), Some("a:pw:w"));
        assert_eq!(config.server.restart_backoff, Duration::from_millis(100));
        assert_eq!(config.session.description, "frame loop");
        assert_eq!(config.session.state_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_str("[server\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_rejects_oversized_ceiling() {
        let err = Config::from_str("[server]\nmax_message_size = 16777217").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "max_message_size",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = Config::from_str("[session]\nstate_interval = \"0s\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "state_interval",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_empty_name() {
        let err = Config::from_str("[session]\nname = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "name", .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4321").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 4321);
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }
}
