//! # Message Buffer
//!
//! ## Purpose
//! The single shared mutable resource between transport delivery tasks and
//! verifying callers: per-destination FIFO queues with deadline-bounded pop
//! and an explicit overflow policy on push. FIFO order is guaranteed among
//! messages on the same destination; destinations are independent queues
//! with no cross-ordering.
//!
//! ## Concurrency
//! Each destination owns a mutex-guarded `VecDeque` plus two [`Notify`]
//! wakeup handles, one for "message available" and one for "space
//! available". Waiters re-check the queue under the lock after every
//! wakeup, so a message is handed to exactly one popper and a slot to
//! exactly one pusher. Pop never blocks past its deadline; push never
//! blocks past the configured bound.

use crate::config::{BufferConfig, OverflowPolicy};
use crate::message::Message;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// What happened to a pushed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Queued for a future pop
    Enqueued,
    /// Rejected by the overflow policy (already logged)
    Dropped,
}

/// Concurrency-safe FIFO buffer, one queue per destination
#[derive(Debug)]
pub struct MessageBuffer {
    queues: DashMap<String, Arc<DestinationQueue>>,
    /// Per-destination capacity; `usize::MAX` when unbounded
    capacity: usize,
    overflow: OverflowPolicy,
    push_timeout: Duration,
}

impl MessageBuffer {
    /// Create a buffer from its configuration section
    pub fn new(config: &BufferConfig) -> Self {
        Self {
            queues: DashMap::new(),
            capacity: config.capacity.unwrap_or(usize::MAX),
            overflow: config.overflow,
            push_timeout: config.push_timeout(),
        }
    }

    /// Append a message to a destination's queue.
    ///
    /// Never fails: a full queue resolves through the overflow policy, and
    /// either outcome is reported in the return value and logged.
    pub async fn push(&self, destination: &str, message: Message) -> PushOutcome {
        let queue = self.queue(destination);

        match self.overflow {
            OverflowPolicy::Drop => {
                if queue.try_push(message, self.capacity) {
                    PushOutcome::Enqueued
                } else {
                    warn!(destination, "buffer full, dropping incoming message");
                    PushOutcome::Dropped
                }
            }
            OverflowPolicy::Block => {
                let deadline = Instant::now() + self.push_timeout;
                if queue.push_until(message, self.capacity, deadline).await {
                    PushOutcome::Enqueued
                } else {
                    warn!(
                        destination,
                        wait_ms = self.push_timeout.as_millis() as u64,
                        "buffer still full after backpressure wait, dropping message"
                    );
                    PushOutcome::Dropped
                }
            }
        }
    }

    /// Remove and return the oldest message on a destination, waiting up to
    /// `timeout` for one to arrive. `None` means the deadline elapsed.
    pub async fn pop(&self, destination: &str, timeout: Duration) -> Option<Message> {
        let queue = self.queue(destination);
        queue.pop_until(Instant::now() + timeout).await
    }

    /// Number of messages currently queued on a destination
    pub fn depth(&self, destination: &str) -> usize {
        self.queues
            .get(destination)
            .map(|q| q.entries.lock().len())
            .unwrap_or(0)
    }

    /// Discard everything still queued, returning how many messages were
    /// thrown away. Called once at relay shutdown.
    pub fn drain(&self) -> usize {
        let mut discarded = 0;
        for entry in self.queues.iter() {
            let mut entries = entry.value().entries.lock();
            discarded += entries.len();
            entries.clear();
        }
        if discarded > 0 {
            debug!(discarded, "discarded buffered messages on shutdown");
        }
        discarded
    }

    fn queue(&self, destination: &str) -> Arc<DestinationQueue> {
        self.queues
            .entry(destination.to_string())
            .or_insert_with(|| Arc::new(DestinationQueue::new()))
            .clone()
    }
}

/// One destination's FIFO queue with wakeup handles
#[derive(Debug)]
struct DestinationQueue {
    entries: Mutex<VecDeque<Message>>,
    /// Signalled once per enqueued message
    readable: Notify,
    /// Signalled once per dequeued message
    writable: Notify,
}

impl DestinationQueue {
    fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            readable: Notify::new(),
            writable: Notify::new(),
        }
    }

    /// Non-blocking push; false when the queue is at capacity
    fn try_push(&self, message: Message, capacity: usize) -> bool {
        let mut entries = self.entries.lock();
        if entries.len() >= capacity {
            return false;
        }
        entries.push_back(message);
        drop(entries);
        self.readable.notify_waiters();
        true
    }

    /// Push with backpressure, waiting for space until the deadline
    async fn push_until(&self, message: Message, capacity: usize, deadline: Instant) -> bool {
        let mut message = Some(message);
        loop {
            // Register the waiter before re-checking the queue, so a pop
            // landing between the check and the await still wakes us
            let vacated = self.writable.notified();
            tokio::pin!(vacated);
            vacated.as_mut().enable();

            {
                let mut entries = self.entries.lock();
                if entries.len() < capacity {
                    entries.push_back(message.take().expect("message consumed once"));
                    drop(entries);
                    self.readable.notify_waiters();
                    return true;
                }
            }

            if timeout_at(deadline, vacated).await.is_err() {
                return false;
            }
        }
    }

    /// Pop with a deadline; `None` when it elapses with the queue empty
    async fn pop_until(&self, deadline: Instant) -> Option<Message> {
        loop {
            // Same registration order as push_until, for the same reason
            let available = self.readable.notified();
            tokio::pin!(available);
            available.as_mut().enable();

            if let Some(message) = self.take_front() {
                return Some(message);
            }

            if timeout_at(deadline, available).await.is_err() {
                // Final check: a push may have landed right at expiry
                return self.take_front();
            }
        }
    }

    fn take_front(&self) -> Option<Message> {
        let message = self.entries.lock().pop_front();
        if message.is_some() {
            self.writable.notify_waiters();
        }
        message
    }
}
