//! Dispatcher throughput and connection counters
//!
//! Byte counters are bumped on every completed read and write. The reactor
//! calls [`DispatcherMetrics::roll`] once per second to turn the bytes seen in
//! the last window into a rate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by the reactor and every session
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Currently open connections
    pub connections_active: AtomicU64,

    /// Total connections accepted
    pub connections_total: AtomicU64,

    /// Successful logins
    pub logins_accepted: AtomicU64,

    /// Rejected login attempts
    pub logins_rejected: AtomicU64,

    /// Connections closed for a bad frame header
    pub framing_errors: AtomicU64,

    /// Outbound frames dropped because a socket queue was full
    pub frames_dropped: AtomicU64,

    /// Reactor restarts after a transport fault
    pub restarts: AtomicU64,

    /// Total bytes read
    pub bytes_in: AtomicU64,

    /// Total bytes written
    pub bytes_out: AtomicU64,

    window_in: AtomicU64,
    window_out: AtomicU64,
    rate_in: AtomicU64,
    rate_out: AtomicU64,
}

impl DispatcherMetrics {
    /// Create a zeroed instance
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            logins_accepted: AtomicU64::new(0),
            logins_rejected: AtomicU64::new(0),
            framing_errors: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            window_in: AtomicU64::new(0),
            window_out: AtomicU64::new(0),
            rate_in: AtomicU64::new(0),
            rate_out: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn login_accepted(&self) {
        self.logins_accepted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn login_rejected(&self) {
        self.logins_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn framing_error(&self) {
        self.framing_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn restarted(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed read
    #[inline]
    pub fn record_in(&self, bytes: usize) {
        self.bytes_in.fetch_add(bytes as u64, Ordering::Relaxed);
        self.window_in.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a completed write
    #[inline]
    pub fn record_out(&self, bytes: usize) {
        self.bytes_out.fetch_add(bytes as u64, Ordering::Relaxed);
        self.window_out.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Close the current window and publish its rates
    ///
    /// `elapsed` is the real length of the window; a zero window leaves the
    /// previous rates untouched.
    pub fn roll(&self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return;
        }

        let seen_in = self.window_in.swap(0, Ordering::Relaxed);
        let seen_out = self.window_out.swap(0, Ordering::Relaxed);
        self.rate_in
            .store((seen_in as f64 / secs).to_bits(), Ordering::Relaxed);
        self.rate_out
            .store((seen_out as f64 / secs).to_bits(), Ordering::Relaxed);
    }

    /// Inbound bytes per second over the last window
    #[inline]
    pub fn rate_in(&self) -> f64 {
        f64::from_bits(self.rate_in.load(Ordering::Relaxed))
    }

    /// Outbound bytes per second over the last window
    #[inline]
    pub fn rate_out(&self) -> f64 {
        f64::from_bits(self.rate_out.load(Ordering::Relaxed))
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            logins_accepted: self.logins_accepted.load(Ordering::Relaxed),
            logins_rejected: self.logins_rejected.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
            bytes_in_per_sec: self.rate_in(),
            bytes_out_per_sec: self.rate_out(),
        }
    }
}

/// Point-in-time snapshot of metrics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub logins_accepted: u64,
    pub logins_rejected: u64,
    pub framing_errors: u64,
    pub frames_dropped: u64,
    pub restarts: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub bytes_in_per_sec: f64,
    pub bytes_out_per_sec: f64,
}

#[cfg(test)]
#[path = "metrics_test.rs"]
mod tests;
