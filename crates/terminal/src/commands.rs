//! Bounded queue of remote shell commands
//!
//! Filled by the `cmd:push_command` handler on the reactor thread and drained
//! by the application. When full, the oldest command is dropped.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

#[derive(Debug)]
pub struct CommandQueue {
    queue: Mutex<VecDeque<String>>,
    available: Condvar,
    capacity: usize,
}

impl CommandQueue {
    /// Create a queue holding at most `capacity` commands (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Enqueue a command, evicting the oldest if full
    pub fn push(&self, command: String) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity
            && let Some(dropped) = queue.pop_front()
        {
            warn!(command = %dropped, "command queue full, dropping oldest");
        }
        queue.push_back(command);
        drop(queue);

        self.available.notify_one();
    }

    /// Take the next command without waiting
    pub fn try_pop(&self) -> Option<String> {
        self.queue.lock().pop_front()
    }

    /// Take the next command, waiting up to `timeout` for one to arrive
    pub fn pop_timeout(&self, timeout: Duration) -> Option<String> {
        let mut queue = self.queue.lock();
        self.available
            .wait_while_for(&mut queue, |queue| queue.is_empty(), timeout);
        queue.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
