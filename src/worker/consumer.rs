//! Consumer worker: round-robin pulls from one or more queues

use crate::core::shutdown::ShutdownSignal;
use crate::queue::{HandoffQueue, ItemStatus};
use crate::system::{SystemError, SystemResult};
use crate::worker::{Destination, Worker, WorkerExit, WorkerKind, WorkerProbe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Cursor over a fixed number of slots, advancing by one on every call
///
/// Over any window of `len` consecutive calls each slot is returned exactly
/// once.
#[derive(Debug, Clone)]
pub struct RoundRobin {
    next: usize,
    len: usize,
}

impl RoundRobin {
    /// `len` is clamped to at least one slot.
    pub fn new(len: usize) -> Self {
        Self {
            next: 0,
            len: len.max(1),
        }
    }

    /// Return the current slot and move to the following one.
    pub fn advance(&mut self) -> usize {
        let current = self.next;
        self.next = (self.next + 1) % self.len;
        current
    }

    pub fn slots(&self) -> usize {
        self.len
    }
}

/// Pulls items from its queues in round-robin order into a shared destination
///
/// Every attempt moves the cursor, whether or not it yielded an item. The
/// loop ends when `max_items` is reached, when shutdown has been requested
/// and `2 x queues` consecutive polls came back empty (so items still
/// buffered when producers stop are drained first), or immediately on
/// cancellation.
pub struct Consumer<T> {
    name: String,
    queues: Vec<Arc<HandoffQueue<T>>>,
    destination: Destination<T>,
    shutdown: ShutdownSignal,
    delay: Duration,
    max_items: Option<usize>,
    poll_timeout: Duration,
    cursor: RoundRobin,
    consumed: usize,
    probe: WorkerProbe,
}

impl<T: Send + 'static> Consumer<T> {
    /// `queues` must be non-empty; the orchestrator rejects empty bindings
    /// before building a consumer.
    pub fn new(
        name: impl Into<String>,
        queues: Vec<Arc<HandoffQueue<T>>>,
        destination: Destination<T>,
        shutdown: ShutdownSignal,
        delay: Duration,
        max_items: Option<usize>,
        poll_timeout: Duration,
    ) -> Self {
        let name = name.into();
        let queue_names: Vec<String> = queues.iter().map(|q| q.name().to_string()).collect();
        let probe = WorkerProbe::new(name.clone(), WorkerKind::Consumer, &queue_names);
        Self {
            name,
            cursor: RoundRobin::new(queues.len()),
            queues,
            destination,
            shutdown,
            delay,
            max_items,
            poll_timeout,
            consumed: 0,
            probe,
        }
    }

    pub fn items_consumed(&self) -> u64 {
        self.probe.processed()
    }

    pub fn max_items(&self) -> Option<usize> {
        self.max_items
    }

    fn fault(&self, error: impl std::fmt::Display) -> SystemError {
        SystemError::worker_fault(&self.name, error)
    }
}

impl<T: Send + 'static> Worker for Consumer<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn probe(&self) -> &WorkerProbe {
        &self.probe
    }

    fn run(&mut self) -> SystemResult<WorkerExit> {
        if self.queues.is_empty() {
            return Err(self.fault("consumer is not bound to any queue"));
        }

        let num_queues = self.queues.len();
        let drain_limit = num_queues * 2;
        let mut empty_streak = 0usize;

        log::info!(
            "[{}] Started - monitoring {} queue(s)",
            self.name,
            num_queues
        );

        let exit = loop {
            if let Some(max) = self.max_items {
                if self.consumed >= max {
                    log::info!("[{}] Reached max items limit ({})", self.name, max);
                    break WorkerExit::MaxItemsReached;
                }
            }
            if self.shutdown.is_cancelled() {
                break WorkerExit::Cancelled;
            }

            let index = self.cursor.advance();
            let queue = Arc::clone(&self.queues[index]);
            self.probe.record_attempt(index);

            // The acknowledgement guard releases the item on every exit path,
            // so a fault here cannot keep the queue's drain barrier shut.
            let polled = queue
                .pop_acknowledged(self.poll_timeout)
                .map_err(|e| self.fault(e))?;
            match polled {
                Some((mut item, ack)) => {
                    empty_streak = 0;
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }

                    item.advance(ItemStatus::Consumed)
                        .map_err(|e| self.fault(e))?;
                    let id = item.id();
                    self.destination
                        .append(item)
                        .map_err(|e| self.fault(e))?;
                    self.consumed += 1;
                    self.probe.record_hit(index);
                    ack.complete().map_err(|e| self.fault(e))?;

                    log::debug!(
                        "[{}] Consumed item {} from '{}' | queue depth {}",
                        self.name,
                        id,
                        queue.name(),
                        queue.len()
                    );
                }
                None => {
                    empty_streak += 1;
                    if empty_streak >= drain_limit && self.shutdown.is_shutdown_requested() {
                        break WorkerExit::DrainComplete;
                    }
                }
            }
        };

        log::info!(
            "[{}] Finished - consumed {} items ({})",
            self.name,
            self.consumed,
            exit
        );
        Ok(exit)
    }
}
