//! Producer worker: drains a finite source into one bounded queue

use crate::core::shutdown::ShutdownSignal;
use crate::queue::{HandoffQueue, Item, QueueError};
use crate::system::{SystemError, SystemResult};
use crate::worker::{Worker, WorkerExit, WorkerKind, WorkerProbe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Enqueues every element of its source, in order, into a single queue
///
/// Element `i` of the source becomes the item with id `i`. The loop ends when
/// the source is exhausted, when shutdown is observed between elements, or on
/// the first push that stays blocked for longer than `put_timeout`; in that
/// last case the remaining elements are never produced.
pub struct Producer<T> {
    name: String,
    source: Vec<T>,
    source_len: usize,
    queue: Arc<HandoffQueue<T>>,
    shutdown: ShutdownSignal,
    delay: Duration,
    put_timeout: Duration,
    probe: WorkerProbe,
}

impl<T: Send + 'static> Producer<T> {
    pub fn new(
        name: impl Into<String>,
        source: impl IntoIterator<Item = T>,
        queue: Arc<HandoffQueue<T>>,
        shutdown: ShutdownSignal,
        delay: Duration,
        put_timeout: Duration,
    ) -> Self {
        let name = name.into();
        let probe = WorkerProbe::new(
            name.clone(),
            WorkerKind::Producer,
            &[queue.name().to_string()],
        );
        let source: Vec<T> = source.into_iter().collect();
        Self {
            name,
            source_len: source.len(),
            source,
            queue,
            shutdown,
            delay,
            put_timeout,
            probe,
        }
    }

    /// Number of elements the source held at construction
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn items_produced(&self) -> u64 {
        self.probe.processed()
    }
}

impl<T: Send + 'static> Worker for Producer<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn probe(&self) -> &WorkerProbe {
        &self.probe
    }

    fn run(&mut self) -> SystemResult<WorkerExit> {
        let source = std::mem::take(&mut self.source);
        log::info!(
            "[{}] Started - producing {} items into '{}'",
            self.name,
            source.len(),
            self.queue.name()
        );

        for (idx, payload) in source.into_iter().enumerate() {
            if self.shutdown.is_shutdown_requested() {
                log::info!("[{}] Stop signal received, shutting down", self.name);
                log::info!(
                    "[{}] Finished - produced {} items",
                    self.name,
                    self.items_produced()
                );
                return Ok(WorkerExit::ShutdownRequested);
            }

            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }

            let item = Item::new(idx as u64, payload);
            self.probe.record_attempt(0);
            match self.queue.push_timeout(item, self.put_timeout) {
                Ok(()) => {
                    self.probe.record_hit(0);
                    log::debug!(
                        "[{}] Produced item {} | queue '{}' depth {}",
                        self.name,
                        idx,
                        self.queue.name(),
                        self.queue.len()
                    );
                }
                Err(QueueError::Full { queue, .. }) => {
                    return Err(SystemError::BackpressureTimeout {
                        producer: self.name.clone(),
                        queue,
                        waited: self.put_timeout,
                    });
                }
                Err(other) => return Err(SystemError::worker_fault(&self.name, other)),
            }
        }

        log::info!(
            "[{}] Finished - produced {} items",
            self.name,
            self.items_produced()
        );
        Ok(WorkerExit::SourceExhausted)
    }
}
