//! Tests for trace tree publishing

use std::time::Duration;

use vantage_trace::{ImageRef, TraceRegistry};

use super::*;

fn run_frame(tracer: &vantage_trace::Tracer) {
    let root = tracer.fork("frame", 0);
    {
        let update = root.branch("update");
        drop(update.branch_with("entities", 42));
    }
    drop(root.branch_with("label", "idle"));
}

// ============================================================================
// Value rendering
// ============================================================================

#[test]
fn test_wire_value_tags() {
    assert_eq!(wire_value(&TraceValue::None), (String::new(), TraceValueKind::Null));
    assert_eq!(
        wire_value(&TraceValue::Duration(Duration::from_micros(1500))),
        ("1500".to_string(), TraceValueKind::Duration)
    );
    assert_eq!(
        wire_value(&TraceValue::Integer(-3)),
        ("-3".to_string(), TraceValueKind::Integer)
    );
    assert_eq!(
        wire_value(&TraceValue::Float(0.5)),
        ("0.500000".to_string(), TraceValueKind::Float)
    );
    assert_eq!(
        wire_value(&TraceValue::String("hi".into())),
        ("hi".to_string(), TraceValueKind::String)
    );
    assert_eq!(
        wire_value(&TraceValue::Boolean(true)),
        ("true".to_string(), TraceValueKind::Boolean)
    );

    let image = TraceValue::Image(ImageRef {
        id: 7,
        width: 2,
        height: 3,
    });
    assert_eq!(wire_value(&image).1, TraceValueKind::Image);
}

// ============================================================================
// Tree building
// ============================================================================

#[tokio::test]
async fn test_build_trees_nests_children() {
    let registry = TraceRegistry::new();
    let tracer = registry.create(0, "main").unwrap();

    run_frame(&tracer);
    let future = tracer.request_snapshot();
    run_frame(&tracer);

    let snapshot = future.wait().await.unwrap();
    let roots = build_trees(&snapshot);

    assert_eq!(roots.len(), 1);
    let root = &roots[0];
    assert_eq!(root.name, "frame");
    assert!(root.is_fresh);
    assert_eq!(root.children.len(), 2);

    let update = &root.children[0];
    assert_eq!(update.name, "update");
    assert_eq!(update.children.len(), 1);
    assert_eq!(update.children[0].name, "entities");
    assert_eq!(update.children[0].value, "42");
    assert_eq!(update.children[0].value_type, TraceValueKind::Integer);

    let label = &root.children[1];
    assert_eq!(label.value, "idle");
    assert!(label.children.is_empty());
}

#[tokio::test]
async fn test_folded_node_keeps_no_children() {
    let registry = TraceRegistry::new();
    let tracer = registry.create(0, "main").unwrap();
    run_frame(&tracer);

    let update = vantage_trace::hash::child_hash(vantage_trace::hash::root_hash("frame"), "update");
    assert!(tracer.control(update, Some(true), None));

    let future = tracer.request_snapshot();
    run_frame(&tracer);
    let roots = build_trees(&future.wait().await.unwrap());

    let update = &roots[0].children[0];
    assert!(update.folded);
    assert!(update.children.is_empty());
}

// ============================================================================
// Pending fetches
// ============================================================================

#[test]
fn test_request_unknown_tracer() {
    let registry = TraceRegistry::new();
    let fetches = PendingFetches::new();
    assert!(!fetches.request(&registry, "ghost"));
    assert!(fetches.is_empty());
}

#[test]
fn test_take_ready_after_fork() {
    let registry = TraceRegistry::new();
    let tracer = registry.create(0, "main").unwrap();
    let fetches = PendingFetches::new();

    run_frame(&tracer);
    assert!(fetches.request(&registry, "main"));
    assert!(fetches.request(&registry, "main"));
    assert_eq!(fetches.len(), 1);
    assert!(fetches.take_ready().is_empty());

    run_frame(&tracer);
    let ready = fetches.take_ready();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].tracer(), "main");
    assert!(fetches.is_empty());
}

#[test]
fn test_take_ready_drops_abandoned() {
    let registry = TraceRegistry::new();
    let tracer = registry.create(0, "main").unwrap();
    let fetches = PendingFetches::new();

    assert!(fetches.request(&registry, "main"));
    drop(tracer);

    assert!(fetches.take_ready().is_empty());
    assert!(fetches.is_empty());
}
