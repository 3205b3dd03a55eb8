//! Remote terminal: dispatcher, command handlers and the publishing worker
//!
//! A [`Terminal`] wires incoming routes to the application and runs one
//! worker thread that keeps observers up to date. The worker is a small state
//! machine:
//!
//! ```text
//!   Idle ──(authenticated socket)──▶ Bootstrap ──▶ Exec
//!    ▲                                   ▲          │
//!    │                                   └─(login)──┤
//!    └──────────────(no sockets)────────────────────┘
//! ```
//!
//! Bootstrap resets every observer: it announces the session, replays shell
//! history and publishes every config registry and the tracer list. Exec
//! pushes only what changed.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};
use vantage_config::{Config, SessionConfig};
use vantage_protocol::{
    Configure, ControlTrace, PushCommand, SessionReset, ShellOutput, SignalFetchTraces,
};
use vantage_trace::TraceRegistry;
use vantage_trace::hash::{FNV_OFFSET_BASIS, fnv1a_fold};

use crate::commands::CommandQueue;
use crate::config_store::ConfigStore;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::shell::ShellBuffer;
use crate::watcher::{ConfigWatcher, PendingFetches, SystemWatcher, TraceWatcher};

/// State reachable from route handlers and the worker
struct Context {
    session: SessionConfig,
    registry: TraceRegistry,
    store: Arc<dyn ConfigStore>,
    commands: CommandQueue,
    shell: Mutex<ShellBuffer>,
    fetches: Arc<PendingFetches>,
    started: SystemTime,
}

/// Wakes the worker early on shutdown
#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    changed: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock() = true;
        self.changed.notify_all();
    }

    /// Sleep up to `timeout`; returns true once stopped
    fn wait(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        self.changed
            .wait_while_for(&mut stopped, |stopped| !*stopped, timeout);
        *stopped
    }
}

struct Worker {
    stop: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

/// Embeddable remote terminal
pub struct Terminal {
    dispatcher: Arc<Dispatcher>,
    context: Arc<Context>,
    worker: Mutex<Option<Worker>>,
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("name", &self.context.session.name)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl Terminal {
    /// Create a terminal and register its route handlers
    ///
    /// Nothing listens until [`Terminal::launch`].
    pub fn new(
        config: &Config,
        registry: TraceRegistry,
        store: Arc<dyn ConfigStore>,
    ) -> Result<Self> {
        let dispatcher = Arc::new(Dispatcher::new(config.server.clone())?);
        let context = Arc::new(Context {
            session: config.session.clone(),
            registry,
            store,
            commands: CommandQueue::new(config.session.command_queue),
            shell: Mutex::new(ShellBuffer::new(config.session.shell_history)),
            fetches: Arc::new(PendingFetches::new()),
            started: SystemTime::now(),
        });

        register_handlers(&dispatcher, &context);

        Ok(Self {
            dispatcher,
            context,
            worker: Mutex::new(None),
        })
    }

    /// Start listening and publishing; a no-op if already running
    pub fn launch(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        self.dispatcher.launch()?;

        let stop = Arc::new(StopSignal::default());
        let publisher = Publisher::new(Arc::clone(&self.dispatcher), Arc::clone(&self.context));
        let signal = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("vantage-terminal".into())
            .spawn(move || publisher.run(&signal))?;

        info!(name = %self.context.session.name, "terminal launched");
        *worker = Some(Worker { stop, handle });
        Ok(())
    }

    /// Stop the worker and the dispatcher; idempotent
    pub fn shutdown(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        worker.stop.stop();
        if worker.handle.join().is_err() {
            error!("terminal worker panicked");
        }
        self.dispatcher.shutdown();
        info!(name = %self.context.session.name, "terminal shut down");
    }

    /// Next remote command, waiting up to `timeout`
    pub fn poll_command(&self, timeout: Duration) -> Option<String> {
        self.context.commands.pop_timeout(timeout)
    }

    /// Append shell output
    ///
    /// Completed lines are pushed to connected observers and kept in the
    /// replay history.
    pub fn write_shell(&self, text: &str) {
        let released = self.context.shell.lock().write(text);
        let Some(content) = released else {
            return;
        };

        if let Err(e) = self.dispatcher.send(&ShellOutput { content }) {
            warn!(error = %e, "failed to send shell output");
        }
    }

    /// Shell output kept for replay
    pub fn shell_history(&self) -> String {
        self.context.shell.lock().history().to_string()
    }

    #[inline]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    #[inline]
    pub fn registry(&self) -> &TraceRegistry {
        &self.context.registry
    }

    /// Whether the worker is running
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn register_handlers(dispatcher: &Dispatcher, context: &Arc<Context>) {
    let routes = dispatcher.routes();

    let ctx = Arc::clone(context);
    routes.on(move |cmd: PushCommand| {
        debug!(command = %cmd.command, "command received");
        ctx.commands.push(cmd.command);
    });

    let ctx = Arc::clone(context);
    routes.on(move |cmd: Configure| {
        for entity in cmd.content {
            let key = entity.config_key;
            if !ctx.store.deserialize(&cmd.class_key, key, entity.value) {
                warn!(registry = %cmd.class_key, key, "config update rejected");
            }
        }
    });

    let ctx = Arc::clone(context);
    routes.on(move |cmd: SignalFetchTraces| {
        for target in &cmd.targets {
            ctx.fetches.request(&ctx.registry, target);
        }
    });

    let ctx = Arc::clone(context);
    routes.on(move |cmd: ControlTrace| {
        let Some(tracer) = ctx.registry.find(&cmd.class_name) else {
            debug!(tracer = %cmd.class_name, "control for unknown tracer");
            return;
        };
        if !tracer.control(cmd.trace_key, cmd.fold, cmd.subscribe) {
            debug!(tracer = %cmd.class_name, key = cmd.trace_key, "control for unknown node");
        }
    });
}

/// Worker phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Nobody is listening
    Idle,
    /// Reset every observer
    Bootstrap,
    /// Push incremental updates
    Exec,
}

/// Worker thread state
struct Publisher {
    dispatcher: Arc<Dispatcher>,
    context: Arc<Context>,
    config: ConfigWatcher,
    traces: TraceWatcher,
    system: SystemWatcher,
    /// Login count at the last bootstrap
    logins_seen: u64,
    last_enumerate: Instant,
}

impl Publisher {
    fn new(dispatcher: Arc<Dispatcher>, context: Arc<Context>) -> Self {
        Self {
            config: ConfigWatcher::new(Arc::clone(&context.store)),
            traces: TraceWatcher::new(context.registry.clone(), Arc::clone(&context.fetches)),
            system: SystemWatcher::new(context.session.state_interval),
            dispatcher,
            context,
            logins_seen: 0,
            last_enumerate: Instant::now(),
        }
    }

    fn run(mut self, stop: &StopSignal) {
        let tick = self.context.session.tick_interval;
        let mut phase = Phase::Idle;

        loop {
            let next = self.step(phase);
            if next != phase {
                debug!(from = ?phase, to = ?next, "terminal worker transition");
                phase = next;
            }

            // Bootstrap runs without waiting for a tick
            if phase != Phase::Bootstrap && stop.wait(tick) {
                break;
            }
        }

        debug!("terminal worker stopped");
    }

    fn step(&mut self, phase: Phase) -> Phase {
        let connected = self.dispatcher.active_connections() > 0;

        match phase {
            Phase::Idle if connected => Phase::Bootstrap,
            Phase::Idle => Phase::Idle,
            Phase::Bootstrap => {
                if let Err(e) = self.bootstrap() {
                    warn!(error = %e, "bootstrap failed");
                }
                Phase::Exec
            }
            Phase::Exec if !connected => Phase::Idle,
            Phase::Exec if self.dispatcher.login_count() != self.logins_seen => Phase::Bootstrap,
            Phase::Exec => {
                if let Err(e) = self.exec() {
                    warn!(error = %e, "publish failed");
                }
                Phase::Exec
            }
        }
    }

    fn bootstrap(&mut self) -> Result<()> {
        self.logins_seen = self.dispatcher.login_count();
        info!(logins = self.logins_seen, "bootstrapping observers");

        self.dispatcher.send(&self.session_reset())?;

        let history = self.context.shell.lock().history().to_string();
        if !history.is_empty() {
            self.dispatcher.send(&ShellOutput { content: history })?;
        }

        self.config.reset();
        self.config.publish_new(&self.dispatcher)?;

        self.traces.reset();
        self.traces.publish_class_list(&self.dispatcher, true)?;

        self.system.reset();
        self.system.publish_due(&self.dispatcher)?;

        self.last_enumerate = Instant::now();
        Ok(())
    }

    fn exec(&mut self) -> Result<()> {
        if self.last_enumerate.elapsed() >= self.context.session.enumerate_interval {
            self.config.publish_new(&self.dispatcher)?;
            self.traces.publish_class_list(&self.dispatcher, false)?;
            self.last_enumerate = Instant::now();
        }

        self.config.publish_dirty(&self.dispatcher)?;
        self.traces.publish_ready(&self.dispatcher)?;
        self.system.publish_due(&self.dispatcher)?;
        Ok(())
    }

    fn session_reset(&self) -> SessionReset {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default();
        let epoch = self
            .context
            .started
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX));

        SessionReset {
            name: self.context.session.name.clone(),
            keystr: session_key(&hostname, std::process::id(), epoch),
            hostname,
            epoch,
            description: self.context.session.description.clone(),
            num_cores: self.system.num_cores(),
        }
    }
}

/// Identifies one process instance across reconnects
fn session_key(hostname: &str, pid: u32, epoch: i64) -> String {
    let seed = fnv1a_fold(FNV_OFFSET_BASIS, hostname);
    let seed = fnv1a_fold(seed, &pid.to_string());
    format!("{:016x}", fnv1a_fold(seed, &epoch.to_string()))
}
