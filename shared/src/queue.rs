//! Bounded, thread-safe FIFO hand-off queue.
//!
//! Used by the relay engine to pass whole TM frames (telemetry queue) and
//! whole CLTUs (command queue) between the socket thread that produces them
//! and the socket thread that consumes them. `offer` never blocks the
//! producer: a full queue drops the newest item rather than applying
//! backpressure. `take` blocks the consumer up to a timeout so it can
//! periodically recheck a shutdown flag.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A fixed-capacity FIFO queue with drop-newest overflow behaviour.
pub struct BoundedQueue<T> {
    capacity: usize,
    state: Mutex<VecDeque<T>>,
    not_empty: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Create a queue that holds at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            not_empty: Condvar::new(),
        }
    }

    /// Attempt to enqueue `item` without blocking.
    ///
    /// Returns `true` if the item was enqueued, `false` if the queue was
    /// already at capacity (the item is dropped; the caller is expected to
    /// emit a diagnostic).
    pub fn offer(&self, item: T) -> bool {
        let mut queue = self.state.lock().expect("queue mutex poisoned");
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(item);
        self.not_empty.notify_one();
        true
    }

    /// Block for up to `timeout` waiting for an item, returning `None` if
    /// the timeout elapses first.
    pub fn take(&self, timeout: Duration) -> Option<T> {
        let mut queue = self.state.lock().expect("queue mutex poisoned");
        if queue.is_empty() {
            let (guard, _) = self
                .not_empty
                .wait_timeout_while(queue, timeout, |q| q.is_empty())
                .expect("queue mutex poisoned");
            queue = guard;
        }
        queue.pop_front()
    }

    /// Current number of queued items.
    pub fn len(&self) -> usize {
        self.state.lock().expect("queue mutex poisoned").len()
    }

    /// `true` if the queue currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed capacity this queue was constructed with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Default capacity for the telemetry and command hand-off queues.
pub const DEFAULT_CAPACITY: usize = 1000;
