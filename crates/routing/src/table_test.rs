//! Tests for RouteTable
//!
//! Tests cover registration, typed dispatch, unknown routes and lock release.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::json;
use vantage_protocol::{ControlTrace, Envelope, PushCommand};

use crate::{RouteTable, RoutingError};

fn push(command: &str) -> Envelope {
    Envelope::new("cmd:push_command", 1, json!({ "command": command }))
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_new_table_is_empty() {
    let table = RouteTable::new();
    assert!(table.is_empty());
    assert_eq!(table.len(), 0);
}

#[test]
fn test_register_and_contains() {
    let table = RouteTable::new();
    table.register("update:x", |_| Ok(()));
    table.on(|_: PushCommand| {});

    assert_eq!(table.len(), 2);
    assert!(table.contains("update:x"));
    assert!(table.contains("cmd:push_command"));
    assert_eq!(table.routes(), vec!["cmd:push_command", "update:x"]);
}

#[test]
#[should_panic(expected = "registered twice")]
fn test_duplicate_registration_panics() {
    let table = RouteTable::new();
    table.on(|_: PushCommand| {});
    table.on(|_: PushCommand| {});
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn test_typed_dispatch_delivers_payload() {
    let table = RouteTable::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    table.on(move |cmd: PushCommand| sink.lock().push(cmd.command));

    assert!(table.dispatch(&push("help")));
    assert!(table.dispatch(&push("quit")));
    assert_eq!(*seen.lock(), vec!["help", "quit"]);
}

#[test]
fn test_unknown_route_returns_false() {
    let table = RouteTable::new();
    let env = Envelope::new("cmd:unheard_of", 1, json!({}));

    assert!(!table.dispatch(&env));
    assert!(matches!(
        table.try_dispatch(&env),
        Err(RoutingError::UnknownRoute { route }) if route == "cmd:unheard_of"
    ));
}

#[test]
fn test_bad_payload_skips_handler() {
    let table = RouteTable::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    table.on(move |_: ControlTrace| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let env = Envelope::new("cmd:control_trace", 1, json!({"trace_key": "not a number"}));
    assert!(!table.dispatch(&env));
    assert!(matches!(
        table.try_dispatch(&env),
        Err(RoutingError::Payload { .. })
    ));
    assert_eq!(hits.load(Ordering::Relaxed), 0);
}

#[test]
fn test_handler_runs_without_table_lock() {
    // Registering from inside a handler needs the write lock
    let table = Arc::new(RouteTable::new());
    let inner = Arc::clone(&table);
    table.on(move |cmd: PushCommand| {
        inner.register(format!("late:{}", cmd.command), |_| Ok(()));
    });

    assert!(table.dispatch(&push("x")));
    assert!(table.contains("late:x"));
}
