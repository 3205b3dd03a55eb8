//! Authenticated socket set and outbound fan-out
//!
//! Each authenticated connection registers the sender half of its outbound
//! queue here. Broadcasting clones one frame into every queue without ever
//! waiting: a full queue drops the frame for that socket only, a closed queue
//! removes the socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::metrics::DispatcherMetrics;

/// Counter for generating unique socket ids
static SOCKET_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique socket id
#[inline]
pub(crate) fn next_socket_id() -> u64 {
    SOCKET_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Sockets that receive broadcasts
#[derive(Debug, Default)]
pub struct ActiveSockets {
    sockets: Mutex<HashMap<u64, mpsc::Sender<Bytes>>>,
    /// Bumped on every successful login
    logins: AtomicU64,
}

impl ActiveSockets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated socket
    pub fn insert(&self, id: u64, sender: mpsc::Sender<Bytes>) {
        self.sockets.lock().insert(id, sender);
        self.logins.fetch_add(1, Ordering::Release);
    }

    /// Deregister a socket, returning whether it was registered
    pub fn remove(&self, id: u64) -> bool {
        self.sockets.lock().remove(&id).is_some()
    }

    /// Drop every socket
    pub fn clear(&self) {
        self.sockets.lock().clear();
    }

    /// Number of registered sockets
    #[inline]
    pub fn len(&self) -> usize {
        self.sockets.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sockets.lock().is_empty()
    }

    /// Whether `id` is registered
    #[inline]
    pub fn contains(&self, id: u64) -> bool {
        self.sockets.lock().contains_key(&id)
    }

    /// Logins accepted since creation
    #[inline]
    pub fn login_count(&self) -> u64 {
        self.logins.load(Ordering::Acquire)
    }

    /// Queue `frame` on every registered socket
    ///
    /// Returns the number of sockets the frame was queued on.
    pub fn broadcast(&self, frame: &Bytes, metrics: &DispatcherMetrics) -> usize {
        let mut sockets = self.sockets.lock();
        let mut delivered = 0;

        sockets.retain(|id, sender| match sender.try_send(frame.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(socket_id = id, "outbound queue full, dropping frame");
                metrics.frame_dropped();
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(socket_id = id, "outbound queue closed, removing socket");
                false
            }
        });

        delivered
    }
}

#[cfg(test)]
#[path = "socket_test.rs"]
mod tests;
