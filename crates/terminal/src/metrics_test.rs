//! Tests for dispatcher metrics

use std::time::Duration;

use super::*;

#[test]
fn test_connection_tracking() {
    let metrics = DispatcherMetrics::new();

    metrics.connection_opened();
    metrics.connection_opened();
    metrics.connection_closed();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.connections_active, 1);
    assert_eq!(snapshot.connections_total, 2);
}

#[test]
fn test_roll_computes_rates() {
    let metrics = DispatcherMetrics::new();

    metrics.record_in(300);
    metrics.record_in(100);
    metrics.record_out(1000);
    metrics.roll(Duration::from_secs(2));

    assert_eq!(metrics.rate_in(), 200.0);
    assert_eq!(metrics.rate_out(), 500.0);
}

#[test]
fn test_roll_resets_window_but_not_totals() {
    let metrics = DispatcherMetrics::new();

    metrics.record_in(64);
    metrics.roll(Duration::from_secs(1));
    metrics.roll(Duration::from_secs(1));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.bytes_in, 64);
    assert_eq!(snapshot.bytes_in_per_sec, 0.0);
}

#[test]
fn test_zero_window_keeps_previous_rate() {
    let metrics = DispatcherMetrics::new();

    metrics.record_out(10);
    metrics.roll(Duration::from_secs(1));
    metrics.record_out(99);
    metrics.roll(Duration::ZERO);

    assert_eq!(metrics.rate_out(), 10.0);
}

#[test]
fn test_login_counters() {
    let metrics = DispatcherMetrics::new();

    metrics.login_rejected();
    metrics.login_rejected();
    metrics.login_accepted();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.logins_accepted, 1);
    assert_eq!(snapshot.logins_rejected, 2);
}
