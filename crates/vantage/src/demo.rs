//! Demo workload: traced loops driven by a config registry

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tracing::{debug, warn};
use vantage_terminal::MemoryConfigStore;
use vantage_trace::{TraceRegistry, Tracer};

/// Registry the demo reads its knobs from
pub const REGISTRY: &str = "demo";

/// Background threads producing traces
pub struct Workload {
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Workload {
    /// Seed the demo registry and start one thread per tracer
    pub fn start(registry: &TraceRegistry, store: Arc<MemoryConfigStore>) -> Result<Self> {
        store.insert_with_metadata(
            REGISTRY,
            "frame.interval_ms",
            json!(16),
            json!({"min": 1, "max": 1000}),
        );
        store.insert(REGISTRY, "frame.entities", json!(128));
        store.insert(REGISTRY, "frame.paused", json!(false));
        store.insert(REGISTRY, "io.interval_ms", json!(250));
        store.insert(REGISTRY, "label", json!("vantage demo"));

        let running = Arc::new(AtomicBool::new(true));

        let frame = registry.create(0, "frame")?;
        frame.set_internals(true);
        let io = registry.create(1, "io")?;

        let threads = vec![
            spawn("demo-frame", frame, Arc::clone(&store), &running, frame_loop)?,
            spawn("demo-io", io, store, &running, io_loop)?,
        ];

        Ok(Self { running, threads })
    }

    /// Stop and join every thread
    pub fn stop(self) {
        self.running.store(false, Ordering::Relaxed);
        for handle in self.threads {
            if handle.join().is_err() {
                warn!("demo thread panicked");
            }
        }
    }
}

type LoopBody = fn(&Tracer, &MemoryConfigStore, u64);

fn spawn(
    name: &str,
    tracer: Arc<Tracer>,
    store: Arc<MemoryConfigStore>,
    running: &Arc<AtomicBool>,
    body: LoopBody,
) -> Result<JoinHandle<()>> {
    let running = Arc::clone(running);
    let interval_key = format!("{}.interval_ms", tracer.name());

    thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            let mut iteration = 0u64;
            while running.load(Ordering::Relaxed) {
                body(&tracer, &store, iteration);
                iteration += 1;

                let interval = read_u64(&store, &interval_key).unwrap_or(100);
                thread::sleep(Duration::from_millis(interval.max(1)));
            }
            debug!(tracer = tracer.name(), iterations = iteration, "demo loop stopped");
        })
        .with_context(|| format!("failed to spawn {name}"))
}

fn read_u64(store: &MemoryConfigStore, path: &str) -> Option<u64> {
    store.get(REGISTRY, path).as_ref().and_then(Value::as_u64)
}

fn frame_loop(tracer: &Tracer, store: &MemoryConfigStore, iteration: u64) {
    let root = tracer.fork("frame", 0);
    root.set(iteration as i64);

    if store.get(REGISTRY, "frame.paused") == Some(Value::Bool(true)) {
        drop(root.branch_with("paused", true));
        return;
    }

    let entities = read_u64(store, "frame.entities").unwrap_or(0);
    {
        let update = root.timer("update");
        let started = Instant::now();
        let mut checksum = 0u64;
        for i in 0..entities {
            checksum = checksum.wrapping_mul(31).wrapping_add(i ^ iteration);
        }
        drop(update.branch_with("entities", entities as i64));
        drop(update.branch_with("checksum", checksum as i64));
        drop(update.branch_with("spin", started.elapsed()));
    }

    {
        let mut render = root.timer("render");
        drop(render.branch_with("load", 0.5 + (iteration % 100) as f64 / 200.0));
        render.switch_to_timer("present");
    }

    if let Some(Value::String(label)) = store.get(REGISTRY, "label") {
        drop(root.branch_with("label", label));
    }
}

fn io_loop(tracer: &Tracer, _store: &MemoryConfigStore, iteration: u64) {
    // Only every other poll is recorded
    let root = tracer.fork("poll", 2);
    if !root.is_valid() {
        return;
    }

    {
        let read = root.timer("read");
        drop(read.branch_with("bytes", (iteration * 512 % 8192) as i64));
    }
    drop(root.branch_with("healthy", iteration % 10 != 9));
}
