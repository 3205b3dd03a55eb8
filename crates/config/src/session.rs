//! Terminal session configuration
//!
//! Identity announced to observers and the cadence of periodic pushes.

use std::time::Duration;

use serde::Deserialize;

/// Session identity and worker cadence
///
/// # Example
///
/// ```toml
/// [session]
/// name = "renderer"
/// description = "frame loop"
/// state_interval = "500ms"
/// enumerate_interval = "1s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name shown to observers
    /// Default: vantage
    pub name: String,

    /// Free-form description
    pub description: String,

    /// Period of `update:session_state` pushes
    /// Default: 500ms
    #[serde(with = "humantime_serde")]
    pub state_interval: Duration,

    /// Period of tracer and config registry re-enumeration
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub enumerate_interval: Duration,

    /// Worker wake-up period
    /// Default: 100ms
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Remote commands held until the application polls them
    /// Default: 128
    pub command_queue: usize,

    /// Bytes of shell output replayed to newly connected observers
    /// Default: 64 KiB
    pub shell_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "vantage".into(),
            description: String::new(),
            state_interval: Duration::from_millis(500),
            enumerate_interval: Duration::from_secs(1),
            tick_interval: Duration::from_millis(100),
            command_queue: 128,
            shell_history: 64 * 1024,
        }
    }
}
