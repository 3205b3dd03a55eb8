//! Typed route payloads
//!
//! Each struct is bound to exactly one route key through [`Message`]. Routes
//! prefixed `update:` flow from the instrumented process to observers; `cmd:`
//! and `auth:` routes flow the other way.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A payload type bound to a fixed route key
pub trait Message: Serialize + DeserializeOwned {
    /// Route key on the wire
    const ROUTE: &'static str;
}

macro_rules! route {
    ($ty:ty => $route:literal) => {
        impl Message for $ty {
            const ROUTE: &'static str = $route;
        }
    };
}

// ============================================================================
// Client → server
// ============================================================================

/// First message on every connection when authentication is enabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Login {
    /// Bearer token (derived from the password, never the raw password)
    pub token: String,
}

/// Queue a shell command for the application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushCommand {
    pub command: String,
}

/// Overwrite config entity values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configure {
    /// Registry the entities belong to
    pub class_key: String,
    pub content: Vec<EntityValue>,
}

/// Request fresh trace snapshots from the named tracers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFetchTraces {
    pub targets: Vec<String>,
}

/// Toggle fold/subscribe flags on one trace node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlTrace {
    /// Tracer name
    pub class_name: String,
    /// Node hash
    pub trace_key: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<bool>,
}

route!(Login => "auth:login");
route!(PushCommand => "cmd:push_command");
route!(Configure => "cmd:configure");
route!(SignalFetchTraces => "cmd:signal_fetch_traces");
route!(ControlTrace => "cmd:control_trace");

// ============================================================================
// Server → client
// ============================================================================

/// Announces a new session; observers discard everything they hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReset {
    pub name: String,
    pub hostname: String,
    /// Identifies this process instance across reconnects
    pub keystr: String,
    /// Session start, milliseconds since the Unix epoch
    pub epoch: i64,
    pub description: String,
    pub num_cores: u32,
}

/// Periodic process telemetry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Whole-machine CPU usage (percent)
    pub cpu_usage_total: f32,
    /// This process' CPU usage (percent)
    pub cpu_usage_self: f32,
    /// Virtual memory in bytes
    pub memory_usage_virtual: u64,
    /// Resident memory in bytes
    pub memory_usage_resident: u64,
    pub num_threads: u32,
    /// Outbound bytes per second
    pub bw_out: f64,
    /// Inbound bytes per second
    pub bw_in: f64,
}

/// Shell text produced by the application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellOutput {
    pub content: String,
}

/// A config entity value keyed by its registry-wide key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityValue {
    pub config_key: u64,
    pub value: Value,
}

/// Full description of one config entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityScheme {
    pub name: String,
    pub config_key: u64,
    pub value: Value,
    #[serde(default)]
    pub metadata: Value,
}

/// Category node of a config registry tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScheme {
    pub name: String,
    #[serde(default)]
    pub subcategories: Vec<CategoryScheme>,
    #[serde(default)]
    pub entities: Vec<EntityScheme>,
}

/// Describes a config registry in full
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConfigClass {
    pub key: String,
    pub root: CategoryScheme,
}

/// Values changed in a registry since the last publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntityUpdate {
    pub class_key: String,
    pub content: Vec<EntityValue>,
}

/// Names of every live tracer, in registry order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceClassList {
    pub content: Vec<String>,
}

/// Payload tag of a trace node value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceValueKind {
    #[default]
    Null,
    /// Microseconds
    Duration,
    Integer,
    Float,
    String,
    Boolean,
    Image,
}

/// One node of an exported trace tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceNodeScheme {
    pub name: String,
    /// Node hash; echo it back in `cmd:control_trace`
    pub trace_key: u64,
    /// Touched in the generation this snapshot was taken from
    pub is_fresh: bool,
    pub subscribing: bool,
    pub folded: bool,
    /// Display rendering of the value
    pub value: String,
    pub value_type: TraceValueKind,
    #[serde(default)]
    pub children: Vec<TraceNodeScheme>,
}

/// A tracer's latest exported tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceUpdate {
    pub class_name: String,
    pub fence: u64,
    pub root: TraceNodeScheme,
}

route!(SessionReset => "update:epoch");
route!(SessionState => "update:session_state");
route!(ShellOutput => "update:shell_output");
route!(NewConfigClass => "update:new_config_class");
route!(ConfigEntityUpdate => "update:config_entity");
route!(TraceClassList => "update:trace_class_list");
route!(TraceUpdate => "update:traces");

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
