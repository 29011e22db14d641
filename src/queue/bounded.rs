//! Bounded hand-off queue
//!
//! A fixed-capacity FIFO guarded by one mutex and three condition variables:
//! - `not_full` wakes producers blocked on a full buffer
//! - `not_empty` wakes consumers blocked on an empty buffer
//! - `all_done` wakes callers waiting on the drain barrier
//!
//! Besides the buffer itself the queue counts unfinished work: every
//! successful push increments it and every [`HandoffQueue::task_done`] call
//! decrements it. The drain barrier is released when that count reaches zero,
//! i.e. when every item ever enqueued has been retrieved *and* acknowledged.

use crate::core::sync::{handle_mutex_poison, wait_timeout_or_poison};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::item::{Item, ItemStatus};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

// Larger queues grow their buffer on demand
const PREALLOCATE_LIMIT: usize = 1024;

/// Point-in-time view of a queue for statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub name: String,
    pub capacity: usize,
    /// Items currently buffered
    pub depth: usize,
    /// Items enqueued but not yet acknowledged by a consumer
    pub unfinished: usize,
    /// Largest depth ever observed
    pub high_water_mark: usize,
    pub total_enqueued: u64,
    pub total_dequeued: u64,
}

struct QueueState<T> {
    items: VecDeque<Item<T>>,
    unfinished: usize,
    high_water_mark: usize,
    total_enqueued: u64,
    total_dequeued: u64,
}

/// Named, fixed-capacity FIFO with time-bounded push and pop
///
/// # Example
///
/// ```rust
/// use handoff::queue::{HandoffQueue, Item, ItemStatus};
/// use std::time::Duration;
///
/// let queue = HandoffQueue::new("main", 2);
/// queue.push_timeout(Item::new(0, "a"), Duration::from_millis(10)).unwrap();
///
/// let item = queue.pop_timeout(Duration::from_millis(10)).unwrap().unwrap();
/// assert_eq!(item.status(), ItemStatus::InQueue);
/// queue.task_done().unwrap();
/// assert!(queue.wait_drained(Duration::ZERO).unwrap());
/// ```
pub struct HandoffQueue<T> {
    name: String,
    capacity: usize,
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    all_done: Condvar,
}

impl<T> HandoffQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// A capacity of zero is clamped to one; the orchestrator rejects it
    /// before it ever gets here.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.into(),
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
                unfinished: 0,
                high_water_mark: 0,
                total_enqueued: 0,
                total_dequeued: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            all_done: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue `item`, waiting at most `timeout` for free space.
    ///
    /// The item is marked [`ItemStatus::InQueue`] under the queue lock at the
    /// moment it is inserted. On timeout the item is dropped and
    /// [`QueueError::Full`] is returned.
    pub fn push_timeout(&self, mut item: Item<T>, timeout: Duration) -> QueueResult<()> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock()?;

        while state.items.len() >= self.capacity {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(QueueError::Full {
                    queue: self.name.clone(),
                    capacity: self.capacity,
                });
            }
            let (guard, _) =
                wait_timeout_or_poison(&self.not_full, state, remaining, |m| self.poisoned(m))?;
            state = guard;
        }

        item.advance(ItemStatus::InQueue)?;
        state.items.push_back(item);
        state.unfinished += 1;
        state.total_enqueued += 1;
        state.high_water_mark = state.high_water_mark.max(state.items.len());
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeue the oldest item, waiting at most `timeout` for one to arrive.
    ///
    /// Returns `Ok(None)` when the wait expires on an empty queue.
    pub fn pop_timeout(&self, timeout: Duration) -> QueueResult<Option<Item<T>>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock()?;

        loop {
            if let Some(item) = state.items.pop_front() {
                state.total_dequeued += 1;
                drop(state);
                self.not_full.notify_one();
                return Ok(Some(item));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let (guard, _) =
                wait_timeout_or_poison(&self.not_empty, state, remaining, |m| self.poisoned(m))?;
            state = guard;
        }
    }

    /// Like [`pop_timeout`](Self::pop_timeout), but pairs the item with a
    /// guard that acknowledges it exactly once.
    ///
    /// The guard calls [`task_done`](Self::task_done) when completed or, if
    /// the caller bails out early (error return or panic), when dropped. An
    /// item handed out this way can never hold the drain barrier shut.
    pub fn pop_acknowledged(
        &self,
        timeout: Duration,
    ) -> QueueResult<Option<(Item<T>, TaskAck<'_, T>)>> {
        Ok(self.pop_timeout(timeout)?.map(|item| {
            (
                item,
                TaskAck {
                    queue: self,
                    pending: true,
                },
            )
        }))
    }

    /// Acknowledge that one previously dequeued item has been fully handled.
    pub fn task_done(&self) -> QueueResult<()> {
        let mut state = self.lock()?;
        if state.unfinished == 0 {
            log::warn!("Queue '{}': task_done called more times than items enqueued", self.name);
            return Ok(());
        }
        state.unfinished -= 1;
        if state.unfinished == 0 {
            self.all_done.notify_all();
        }
        Ok(())
    }

    /// Wait at most `timeout` for every enqueued item to be acknowledged.
    ///
    /// Returns `Ok(true)` once the queue is drained, `Ok(false)` on timeout.
    pub fn wait_drained(&self, timeout: Duration) -> QueueResult<bool> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock()?;

        while state.unfinished > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            let (guard, _) =
                wait_timeout_or_poison(&self.all_done, state, remaining, |m| self.poisoned(m))?;
            state = guard;
        }
        Ok(true)
    }

    /// Current number of buffered items
    pub fn len(&self) -> usize {
        self.read_state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items enqueued but not yet acknowledged
    pub fn unfinished(&self) -> usize {
        self.read_state().unfinished
    }

    pub fn high_water_mark(&self) -> usize {
        self.read_state().high_water_mark
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.read_state();
        QueueSnapshot {
            name: self.name.clone(),
            capacity: self.capacity,
            depth: state.items.len(),
            unfinished: state.unfinished,
            high_water_mark: state.high_water_mark,
            total_enqueued: state.total_enqueued,
            total_dequeued: state.total_dequeued,
        }
    }

    fn lock(&self) -> QueueResult<MutexGuard<'_, QueueState<T>>> {
        handle_mutex_poison(self.state.lock(), |m| self.poisoned(m))
    }

    // Introspection keeps working after a poisoning panic; the counters are
    // plain integers and stay meaningful.
    fn read_state(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn poisoned(&self, message: String) -> QueueError {
        QueueError::Poisoned {
            queue: self.name.clone(),
            message,
        }
    }
}

/// Outstanding acknowledgement for one item taken from a [`HandoffQueue`]
#[must_use = "dropping the guard acknowledges the item immediately"]
pub struct TaskAck<'a, T> {
    queue: &'a HandoffQueue<T>,
    pending: bool,
}

impl<T> TaskAck<'_, T> {
    /// Acknowledge the item after it has been fully handled.
    pub fn complete(mut self) -> QueueResult<()> {
        self.pending = false;
        self.queue.task_done()
    }
}

impl<T> Drop for TaskAck<'_, T> {
    fn drop(&mut self) {
        if !self.pending {
            return;
        }
        log::debug!(
            "Queue '{}': releasing an item abandoned by its consumer",
            self.queue.name
        );
        if let Err(e) = self.queue.task_done() {
            log::error!("Queue '{}': acknowledgement failed: {}", self.queue.name, e);
        }
    }
}

impl<T> std::fmt::Debug for HandoffQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();
        f.debug_struct("HandoffQueue")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("depth", &state.items.len())
            .field("unfinished", &state.unfinished)
            .finish()
    }
}
