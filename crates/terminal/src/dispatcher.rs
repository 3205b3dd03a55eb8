//! Framed TCP dispatcher
//!
//! The dispatcher owns one reactor thread running a single-threaded tokio
//! runtime. The reactor accepts connections, runs one [`Session`] task per
//! socket for the read side and one writer task per socket for the outbound
//! queue, and rolls the throughput counters once a second.
//!
//! # Restart policy
//!
//! If the accept loop fails (bind error, accept error) the reactor logs the
//! fault, waits `restart_backoff`, builds a fresh runtime and binds again.
//! Only [`Dispatcher::shutdown`] stops it.
//!
//! # Example
//!
//! ```ignore
//! let dispatcher = Dispatcher::new(ServerConfig::default())?;
//! dispatcher.routes().on(|cmd: PushCommand| println!("{}", cmd.command));
//! dispatcher.launch()?;
//! dispatcher.send(&ShellOutput { content: "ready\n".into() })?;
//! dispatcher.shutdown();
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Builder;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use vantage_auth::AuthTable;
use vantage_config::ServerConfig;
use vantage_protocol::{Envelope, MAX_ENCODABLE_SIZE, Message};
use vantage_routing::RouteTable;

use crate::error::{Result, TerminalError};
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::session::{Session, SessionGuard, write_loop};
use crate::socket::{ActiveSockets, next_socket_id};

/// Throughput roll-over period
const ROLL_INTERVAL: Duration = Duration::from_secs(1);

/// Idle time before keepalive probes start
const KEEPALIVE_TIME: Duration = Duration::from_secs(60);

/// State shared by the reactor, every session and the public handle
pub(crate) struct Shared {
    pub(crate) config: ServerConfig,
    pub(crate) auth: Option<AuthTable>,
    pub(crate) routes: RouteTable,
    pub(crate) sockets: ActiveSockets,
    pub(crate) metrics: DispatcherMetrics,
    fence: AtomicI64,
    bound: Mutex<Option<SocketAddr>>,
    bound_changed: Condvar,
}

impl Shared {
    fn set_bound(&self, address: Option<SocketAddr>) {
        *self.bound.lock() = address;
        self.bound_changed.notify_all();
    }
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Multi-connection framed dispatcher
pub struct Dispatcher {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("address", &self.shared.config.bind_address())
            .field("auth", &self.shared.auth.is_some())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher; nothing is bound until [`Dispatcher::launch`]
    ///
    /// # Errors
    ///
    /// Returns an error if the credential string cannot be parsed or the
    /// message size ceiling cannot be encoded in a frame header.
    pub fn new(config: ServerConfig) -> Result<Self> {
        if config.max_message_size == 0 || config.max_message_size > MAX_ENCODABLE_SIZE {
            return Err(TerminalError::invalid_config(format!(
                "max_message_size must be within 1..={MAX_ENCODABLE_SIZE}"
            )));
        }
        if config.outbound_queue == 0 {
            return Err(TerminalError::invalid_config(
                "outbound_queue must be at least 1",
            ));
        }

        // Blank credentials mean no auth, same as none at all
        let auth = match config.credentials.as_deref() {
            Some(credentials) if config.auth_enabled() => Some(credentials.parse::<AuthTable>()?),
            _ => None,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                auth,
                routes: RouteTable::new(),
                sockets: ActiveSockets::new(),
                metrics: DispatcherMetrics::new(),
                fence: AtomicI64::new(0),
                bound: Mutex::new(None),
                bound_changed: Condvar::new(),
            }),
            worker: Mutex::new(None),
        })
    }

    /// Route table for incoming messages
    ///
    /// Register handlers before [`Dispatcher::launch`]; handlers run on the
    /// reactor thread and must not block.
    #[inline]
    pub fn routes(&self) -> &RouteTable {
        &self.shared.routes
    }

    /// Whether the reactor thread is running
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Start the reactor thread; calling it again while running is a no-op
    pub fn launch(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let shared = Arc::clone(&self.shared);
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name("vantage-reactor".into())
            .spawn(move || reactor_loop(shared, token))?;

        *worker = Some(Worker { cancel, handle });
        Ok(())
    }

    /// Stop the reactor, close every socket and join the thread
    ///
    /// Idempotent. Must not be called from a route handler.
    pub fn shutdown(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        worker.cancel.cancel();
        if worker.handle.join().is_err() {
            error!("reactor thread panicked");
        }

        self.shared.sockets.clear();
        self.shared.set_bound(None);
        info!("dispatcher shut down");
    }

    /// Broadcast a typed message to every authenticated socket
    ///
    /// The message is serialized once. Returns the number of sockets it was
    /// queued on; delivery is best effort.
    pub fn send<M: Message>(&self, message: &M) -> Result<usize> {
        if self.shared.sockets.is_empty() {
            return Ok(0);
        }

        let fence = self.shared.fence.fetch_add(1, Ordering::Relaxed) + 1;
        let frame = Envelope::from_message(fence, message)?.encode()?;
        Ok(self.shared.sockets.broadcast(&frame, &self.shared.metrics))
    }

    /// Address the listener is bound to, if bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.shared.bound.lock()
    }

    /// Block until the listener is bound or `timeout` elapses
    pub fn wait_bound(&self, timeout: Duration) -> Option<SocketAddr> {
        let mut bound = self.shared.bound.lock();
        self.shared
            .bound_changed
            .wait_while_for(&mut bound, |bound| bound.is_none(), timeout);
        *bound
    }

    /// Number of authenticated sockets
    #[inline]
    pub fn active_connections(&self) -> usize {
        self.shared.sockets.len()
    }

    /// Logins accepted since creation
    #[inline]
    pub fn login_count(&self) -> u64 {
        self.shared.sockets.login_count()
    }

    /// Whether logins are checked against a credential table
    #[inline]
    pub fn auth_enabled(&self) -> bool {
        self.shared.auth.is_some()
    }

    #[inline]
    pub fn metrics(&self) -> &DispatcherMetrics {
        &self.shared.metrics
    }

    #[inline]
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Reactor thread body: serve, and on failure back off and serve again
///
/// Each run gets its own runtime. A failed run's runtime is dropped before
/// the backoff so its sessions end with it.
fn reactor_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let backoff = shared.config.restart_backoff;
    let mut restarting = false;

    while !cancel.is_cancelled() {
        let runtime = match Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "failed to build reactor runtime");
                break;
            }
        };

        let result = runtime.block_on(async {
            if restarting {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
            serve(&shared, &cancel).await
        });
        drop(runtime);

        let Err(e) = result else {
            break;
        };

        shared.metrics.restarted();
        error!(error = %e, backoff = ?backoff, "reactor failed, restarting");
        restarting = true;
    }

    debug!("reactor stopped");
}

/// Bind and run the accept loop until cancelled or a transport fault
async fn serve(shared: &Arc<Shared>, cancel: &CancellationToken) -> Result<()> {
    let address = shared.config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| TerminalError::bind(&address, e))?;
    let local = listener.local_addr()?;

    shared.set_bound(Some(local));
    info!(address = %local, auth = shared.auth.is_some(), "dispatcher listening");

    let mut roll = tokio::time::interval(ROLL_INTERVAL);
    roll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_roll = Instant::now();

    let result = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            _ = roll.tick() => {
                let now = Instant::now();
                shared.metrics.roll(now.duration_since(last_roll));
                last_roll = now;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => spawn_session(shared, stream, peer, cancel.child_token()),
                Err(e) => break Err(TerminalError::Io(e)),
            },
        }
    };

    shared.sockets.clear();
    shared.set_bound(None);
    info!(address = %local, "dispatcher stopped listening");
    result
}

fn spawn_session(
    shared: &Arc<Shared>,
    stream: TcpStream,
    peer: SocketAddr,
    cancel: CancellationToken,
) {
    configure_socket(&stream, shared.config.nodelay);

    let id = next_socket_id();
    shared.metrics.connection_opened();
    info!(socket_id = id, peer = %peer, "connection accepted");

    let (reader, writer) = stream.into_split();
    let (tx, rx) = mpsc::channel(shared.config.outbound_queue);

    tokio::spawn(write_loop(
        id,
        writer,
        rx,
        Arc::clone(shared),
        cancel.clone(),
    ));

    let session = Session::new(id, peer, Arc::clone(shared), reader, tx);
    let guard = SessionGuard {
        id,
        peer,
        shared: Arc::clone(shared),
        cancel: cancel.clone(),
    };
    tokio::spawn(async move {
        let _guard = guard;
        session.run(cancel).await;
    });
}

/// Apply low-level socket options
fn configure_socket(stream: &TcpStream, nodelay: bool) {
    if let Err(e) = stream.set_nodelay(nodelay) {
        debug!(error = %e, "failed to set TCP_NODELAY");
    }

    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_TIME);
    if let Err(e) = SockRef::from(stream).set_tcp_keepalive(&keepalive) {
        debug!(error = %e, "failed to set TCP keepalive");
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;
