//! Process telemetry publisher

use std::time::{Duration, Instant};

use sysinfo::{Pid, System};
use tracing::debug;
use vantage_protocol::SessionState;

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::metrics::DispatcherMetrics;

/// Samples CPU and memory figures and pushes `update:session_state`
pub struct SystemWatcher {
    system: System,
    pid: Option<Pid>,
    interval: Duration,
    last: Option<Instant>,
}

impl SystemWatcher {
    pub fn new(interval: Duration) -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                debug!(error = e, "process metrics unavailable");
                None
            }
        };

        let mut system = System::new();
        system.refresh_cpu();

        Self {
            system,
            pid,
            interval,
            last: None,
        }
    }

    /// Logical CPU count
    pub fn num_cores(&self) -> u32 {
        u32::try_from(self.system.cpus().len()).unwrap_or(u32::MAX)
    }

    /// Make the next [`SystemWatcher::publish_due`] send immediately
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Send a sample if the interval has elapsed
    pub fn publish_due(&mut self, dispatcher: &Dispatcher) -> Result<bool> {
        if self.last.is_some_and(|last| last.elapsed() < self.interval) {
            return Ok(false);
        }

        let state = self.sample(dispatcher.metrics());
        dispatcher.send(&state)?;
        self.last = Some(Instant::now());
        Ok(true)
    }

    /// Take one sample
    pub fn sample(&mut self, metrics: &DispatcherMetrics) -> SessionState {
        self.system.refresh_cpu();

        let mut state = SessionState {
            cpu_usage_total: self.system.global_cpu_info().cpu_usage(),
            num_threads: thread_count(),
            bw_out: metrics.rate_out(),
            bw_in: metrics.rate_in(),
            ..Default::default()
        };

        if let Some(pid) = self.pid
            && self.system.refresh_process(pid)
            && let Some(process) = self.system.process(pid)
        {
            state.cpu_usage_self = process.cpu_usage();
            state.memory_usage_resident = process.memory();
            state.memory_usage_virtual = process.virtual_memory();
        }

        state
    }
}

#[cfg(target_os = "linux")]
fn thread_count() -> u32 {
    std::fs::read_dir("/proc/self/task")
        .map(|tasks| u32::try_from(tasks.count()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

#[cfg(not(target_os = "linux"))]
fn thread_count() -> u32 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_reports_bandwidth_and_memory() {
        let metrics = DispatcherMetrics::new();
        metrics.record_out(2000);
        metrics.roll(Duration::from_secs(2));

        let mut watcher = SystemWatcher::new(Duration::from_millis(500));
        let state = watcher.sample(&metrics);

        assert_eq!(state.bw_out, 1000.0);
        assert_eq!(state.bw_in, 0.0);
        assert!(state.cpu_usage_total >= 0.0);
        if watcher.pid.is_some() {
            assert!(state.memory_usage_resident > 0);
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_thread_count_includes_current_thread() {
        assert!(thread_count() >= 1);
    }

    #[test]
    fn test_num_cores() {
        let watcher = SystemWatcher::new(Duration::from_secs(1));
        assert!(watcher.num_cores() >= 1);
    }
}
