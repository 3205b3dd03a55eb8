//! Tests for typed route payloads

use super::*;
use serde_json::json;

#[test]
fn test_routes_are_distinct() {
    let routes = [
        Login::ROUTE,
        PushCommand::ROUTE,
        Configure::ROUTE,
        SignalFetchTraces::ROUTE,
        ControlTrace::ROUTE,
        SessionReset::ROUTE,
        SessionState::ROUTE,
        ShellOutput::ROUTE,
        NewConfigClass::ROUTE,
        ConfigEntityUpdate::ROUTE,
        TraceClassList::ROUTE,
        TraceUpdate::ROUTE,
    ];
    let unique: std::collections::HashSet<_> = routes.iter().collect();
    assert_eq!(unique.len(), routes.len());
}

#[test]
fn test_control_trace_optional_flags() {
    let ctl: ControlTrace =
        serde_json::from_value(json!({"class_name": "main", "trace_key": 7, "fold": true}))
            .unwrap();
    assert_eq!(ctl.fold, Some(true));
    assert_eq!(ctl.subscribe, None);

    let value = serde_json::to_value(&ctl).unwrap();
    assert!(value.get("subscribe").is_none());
}

#[test]
fn test_trace_value_kind_wire_names() {
    assert_eq!(
        serde_json::to_value(TraceValueKind::Duration).unwrap(),
        json!("duration")
    );
    assert_eq!(serde_json::to_value(TraceValueKind::Null).unwrap(), json!("null"));
}

#[test]
fn test_trace_node_children_default() {
    let node: TraceNodeScheme = serde_json::from_value(json!({
        "name": "root",
        "trace_key": 1,
        "is_fresh": true,
        "subscribing": false,
        "folded": false,
        "value": "[null]",
        "value_type": "null"
    }))
    .unwrap();
    assert!(node.children.is_empty());
}
