//! Per-connection session state machine
//!
//! ```text
//!                 HeaderAccepted                 LoginAccepted(rw)
//! AwaitHeader(pre) ─────────────▶ AwaitBody(pre) ──────────────────▶ AwaitHeader(active)
//!        ▲                             │    │                            │      ▲
//!        └──────── LoginRejected ──────┘    │ LoginAccepted(ro)          │      │ Dispatched
//!                                           ▼                            ▼      │
//!                                      Discarding ◀─┐             AwaitBody(active)
//!                                           └───────┘ Discarded
//! ```
//!
//! Every state moves to `Closed` on `Disconnected`, `Shutdown` or a rejected
//! header. Transitions are a pure function so the table can be tested without
//! sockets; [`Session`] performs the I/O for each state and feeds the result
//! back through [`SessionState::next`].

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use vantage_auth::Access;
use vantage_protocol::{Envelope, HEADER_SIZE, Login, decode_header};

use crate::dispatcher::Shared;

/// Read buffer growth step while discarding
const DISCARD_CHUNK: usize = 4096;

/// Whether the peer has logged in yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreLogin,
    Active,
}

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for an 8-byte frame header
    AwaitHeader(Phase),
    /// Waiting for a body of `len` bytes
    AwaitBody { phase: Phase, len: usize },
    /// Read-only peer: input is read and dropped forever
    Discarding,
    Closed,
}

/// Outcome of one step of I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Header decoded, body of this length follows
    HeaderAccepted(usize),
    /// Bad magic, malformed or oversized length
    HeaderRejected,
    LoginAccepted(Access),
    /// Bad token, wrong route or unparsable login body
    LoginRejected,
    /// Steady-state body consumed, whether or not a handler ran
    Dispatched,
    /// Input dropped while discarding
    Discarded,
    /// EOF or I/O error
    Disconnected,
    Shutdown,
}

impl SessionState {
    /// Initial state of every new connection
    pub const INITIAL: Self = Self::AwaitHeader(Phase::PreLogin);

    /// Apply `event`; transitions not in the table close the session
    #[must_use]
    pub fn next(self, event: SessionEvent) -> Self {
        use SessionEvent as E;

        match (self, event) {
            (Self::Closed, _) => Self::Closed,
            (_, E::Disconnected | E::Shutdown) => Self::Closed,

            (Self::AwaitHeader(phase), E::HeaderAccepted(len)) => Self::AwaitBody { phase, len },
            (Self::AwaitHeader(_), E::HeaderRejected) => Self::Closed,

            (
                Self::AwaitBody {
                    phase: Phase::PreLogin,
                    ..
                },
                E::LoginAccepted(Access::ReadWrite),
            ) => Self::AwaitHeader(Phase::Active),
            (
                Self::AwaitBody {
                    phase: Phase::PreLogin,
                    ..
                },
                E::LoginAccepted(Access::ReadOnly),
            ) => Self::Discarding,
            (
                Self::AwaitBody {
                    phase: Phase::PreLogin,
                    ..
                },
                E::LoginRejected,
            ) => Self::AwaitHeader(Phase::PreLogin),

            (
                Self::AwaitBody {
                    phase: Phase::Active,
                    ..
                },
                E::Dispatched,
            ) => Self::AwaitHeader(Phase::Active),

            (Self::Discarding, E::Discarded) => Self::Discarding,

            _ => Self::Closed,
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// One accepted connection's read side
pub(crate) struct Session {
    id: u64,
    peer: SocketAddr,
    shared: Arc<Shared>,
    reader: OwnedReadHalf,
    outbound: mpsc::Sender<Bytes>,
    state: SessionState,
    buffer: BytesMut,
}

impl Session {
    pub(crate) fn new(
        id: u64,
        peer: SocketAddr,
        shared: Arc<Shared>,
        reader: OwnedReadHalf,
        outbound: mpsc::Sender<Bytes>,
    ) -> Self {
        Self {
            id,
            peer,
            shared,
            reader,
            outbound,
            state: SessionState::INITIAL,
            buffer: BytesMut::new(),
        }
    }

    /// Drive the state machine until the session closes
    pub(crate) async fn run(mut self, cancel: CancellationToken) {
        while !self.state.is_closed() {
            let event = tokio::select! {
                _ = cancel.cancelled() => SessionEvent::Shutdown,
                event = self.step() => event,
            };

            let next = self.state.next(event);
            trace!(socket_id = self.id, from = ?self.state, ?event, to = ?next, "session transition");
            self.state = next;
        }
    }

    async fn step(&mut self) -> SessionEvent {
        match self.state {
            SessionState::AwaitHeader(_) => self.read_header().await,
            SessionState::AwaitBody {
                phase: Phase::PreLogin,
                len,
            } => self.read_login(len).await,
            SessionState::AwaitBody {
                phase: Phase::Active,
                len,
            } => self.read_message(len).await,
            SessionState::Discarding => self.discard().await,
            SessionState::Closed => SessionEvent::Disconnected,
        }
    }

    async fn read_header(&mut self) -> SessionEvent {
        let mut header = [0u8; HEADER_SIZE];
        if let Err(e) = self.reader.read_exact(&mut header).await {
            debug!(socket_id = self.id, error = %e, "failed to receive header");
            return SessionEvent::Disconnected;
        }
        self.shared.metrics.record_in(HEADER_SIZE);

        match decode_header(&header, self.shared.config.max_message_size) {
            Ok(len) => SessionEvent::HeaderAccepted(len),
            Err(e) => {
                warn!(
                    socket_id = self.id,
                    peer = %self.peer,
                    error = %e,
                    "protocol error, closing connection"
                );
                self.shared.metrics.framing_error();
                SessionEvent::HeaderRejected
            }
        }
    }

    async fn read_body(&mut self, len: usize) -> bool {
        self.buffer.clear();
        self.buffer.resize(len, 0);

        match self.reader.read_exact(&mut self.buffer[..]).await {
            Ok(_) => {
                self.shared.metrics.record_in(len);
                true
            }
            Err(e) => {
                debug!(socket_id = self.id, error = %e, "failed to receive body");
                false
            }
        }
    }

    async fn read_login(&mut self, len: usize) -> SessionEvent {
        if !self.read_body(len).await {
            return SessionEvent::Disconnected;
        }

        let access = match &self.shared.auth {
            None => {
                info!(socket_id = self.id, peer = %self.peer, "login accepted, authentication disabled");
                Some(Access::ReadWrite)
            }
            Some(table) => match Envelope::decode(&self.buffer).and_then(|e| e.parse::<Login>()) {
                Ok(login) => table.validate(&login.token).map(|entry| {
                    info!(
                        socket_id = self.id,
                        peer = %self.peer,
                        id = entry.id(),
                        access = entry.access().as_str(),
                        "login accepted"
                    );
                    entry.access()
                }),
                Err(e) => {
                    error!(socket_id = self.id, error = %e, "failed to parse login message");
                    None
                }
            },
        };

        match access {
            Some(access) => {
                self.shared.metrics.login_accepted();
                self.shared.sockets.insert(self.id, self.outbound.clone());
                SessionEvent::LoginAccepted(access)
            }
            None => {
                warn!(socket_id = self.id, peer = %self.peer, "invalid login attempt");
                self.shared.metrics.login_rejected();
                SessionEvent::LoginRejected
            }
        }
    }

    async fn read_message(&mut self, len: usize) -> SessionEvent {
        if !self.read_body(len).await {
            return SessionEvent::Disconnected;
        }

        match Envelope::decode(&self.buffer) {
            Ok(envelope) => {
                self.shared.routes.dispatch(&envelope);
            }
            Err(e) => {
                warn!(socket_id = self.id, error = %e, "failed to parse incoming message");
            }
        }
        SessionEvent::Dispatched
    }

    async fn discard(&mut self) -> SessionEvent {
        self.buffer.clear();
        self.buffer.reserve(DISCARD_CHUNK);

        match self.reader.read_buf(&mut self.buffer).await {
            Ok(0) => SessionEvent::Disconnected,
            Ok(n) => {
                self.shared.metrics.record_in(n);
                trace!(socket_id = self.id, bytes = n, "discarded input");
                SessionEvent::Discarded
            }
            Err(e) => {
                debug!(socket_id = self.id, error = %e, "read failed while discarding");
                SessionEvent::Disconnected
            }
        }
    }
}

/// Drain a socket's outbound queue onto its write half
///
/// A failed write cancels `cancel`, which closes the session's read side too.
pub(crate) async fn write_loop(
    id: u64,
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Bytes>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        if let Err(e) = writer.write_all(&frame).await {
            debug!(socket_id = id, error = %e, "write failed, closing connection");
            cancel.cancel();
            break;
        }
        shared.metrics.record_out(frame.len());
    }

    let _ = writer.shutdown().await;
}

/// Deregisters a session when its task ends, however it ends
pub(crate) struct SessionGuard {
    pub(crate) id: u64,
    pub(crate) peer: SocketAddr,
    pub(crate) shared: Arc<Shared>,
    pub(crate) cancel: CancellationToken,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.shared.sockets.remove(self.id);
        self.shared.metrics.connection_closed();
        info!(socket_id = self.id, peer = %self.peer, "connection closed");
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
