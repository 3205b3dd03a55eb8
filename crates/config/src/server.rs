//! Dispatcher listener configuration

use std::time::Duration;

use serde::Deserialize;

/// Default listener port
pub const DEFAULT_PORT: u16 = 15572;

/// Default body size ceiling (1 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1 << 20;

/// Listener and connection settings
///
/// # Example
///
/// ```toml
/// [server]
/// address = "127.0.0.1"
/// port = 15572
/// max_message_size = 1048576
/// credentials = "admin:s3cret:w;viewer:guest:r"
/// restart_backoff = "3s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    /// Default: 0.0.0.0
    pub address: String,

    /// Bind port (0 picks an ephemeral port)
    /// Default: 15572
    pub port: u16,

    /// Exclusive upper bound on a received body, in bytes
    /// Default: 1 MiB
    pub max_message_size: usize,

    /// Credential string `<id>:<pw>:<access>[;...]`
    /// Default: none (every connection is accepted read-write)
    pub credentials: Option<String>,

    /// Delay before the reactor is rebuilt after a transport fault
    /// Default: 3s
    #[serde(with = "humantime_serde")]
    pub restart_backoff: Duration,

    /// Frames queued per socket before new pushes to it are dropped
    /// Default: 256
    pub outbound_queue: usize,

    /// Disable Nagle's algorithm on accepted sockets
    /// Default: true
    pub nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            credentials: None,
            restart_backoff: Duration::from_secs(3),
            outbound_queue: 256,
            nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Get the bind address as "address:port"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Whether logins are checked against a credential table
    #[inline]
    pub fn auth_enabled(&self) -> bool {
        self.credentials.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_message_size, 1 << 20);
        assert_eq!(config.restart_backoff, Duration::from_secs(3));
        assert!(!config.auth_enabled());
    }

    #[test]
    fn test_bind_address() {
        let config = ServerConfig {
            address: "127.0.0.1".into(),
            port: 9000,
            ..Default::default()
        };
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_deserialize_durations() {
        let config: ServerConfig = toml::from_str("restart_backoff = \"750ms\"").unwrap();
        assert_eq!(config.restart_backoff, Duration::from_millis(750));
    }

    #[test]
    fn test_blank_credentials_disable_auth() {
        let config: ServerConfig = toml::from_str("credentials = \"  \"").unwrap();
        assert!(!config.auth_enabled());

        let config: ServerConfig = toml::from_str("credentials = \"a:b:w\"").unwrap();
        assert!(config.auth_enabled());
    }
}
