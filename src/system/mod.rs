//! HandoffSystem - Orchestration of queues, producers and consumers
//!
//! The system owns a registry of named queues and the worker bindings that
//! reference them. Topology is frozen once [`HandoffSystem::start`] has been
//! called; from then on the system only moves forward:
//!
//! ```text
//! Configuring ──start──► Running ──wait_for_completion──► Draining ──► Stopped
//!                           └──────────────stop()──────────────────────────▲
//! ```
//!
//! Graceful completion is two-phase. Producers are joined first, then every
//! queue's drain barrier is awaited, and only then are consumers told to
//! drain and leave. Every wait along the way is bounded, so `Stopped` is
//! always reached.

mod error;
mod report;
mod stats;
mod tuning;

pub use error::{SystemError, SystemResult};
pub use report::render_statistics;
pub use stats::{ConsumerStatistics, ProducerStatistics, SystemStatistics};
pub use tuning::{SystemTuning, TuningConfig};

use crate::core::shutdown::ShutdownSignal;
use crate::queue::HandoffQueue;
use crate::worker::{
    spawn_worker, Consumer, Destination, Producer, Worker, WorkerHandle, WorkerProbe,
};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle state of a [`HandoffSystem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    Configuring,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemState::Configuring => "configuring",
            SystemState::Running => "running",
            SystemState::Draining => "draining",
            SystemState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// One or more queue names a consumer is bound to, in round-robin order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSelection(Vec<String>);

impl QueueSelection {
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for QueueSelection {
    fn from(name: &str) -> Self {
        QueueSelection(vec![name.to_string()])
    }
}

impl From<String> for QueueSelection {
    fn from(name: String) -> Self {
        QueueSelection(vec![name])
    }
}

impl From<Vec<String>> for QueueSelection {
    fn from(names: Vec<String>) -> Self {
        QueueSelection(names)
    }
}

impl From<Vec<&str>> for QueueSelection {
    fn from(names: Vec<&str>) -> Self {
        QueueSelection(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for QueueSelection {
    fn from(names: &[&str]) -> Self {
        QueueSelection(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for QueueSelection {
    fn from(names: [&str; N]) -> Self {
        QueueSelection(names.iter().map(|n| n.to_string()).collect())
    }
}

struct ProducerBinding<T> {
    probe: WorkerProbe,
    queue: String,
    source_len: usize,
    pending: Option<Producer<T>>,
    handle: Option<WorkerHandle>,
}

struct ConsumerBinding<T> {
    probe: WorkerProbe,
    queues: Vec<String>,
    destination: Destination<T>,
    max_items: Option<usize>,
    pending: Option<Consumer<T>>,
    handle: Option<WorkerHandle>,
}

impl<T> ConsumerBinding<T> {
    fn is_live(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// Owner of a producer/consumer topology and its lifecycle
///
/// # Example
///
/// ```rust
/// use handoff::system::HandoffSystem;
/// use handoff::worker::Destination;
/// use std::time::Duration;
///
/// let mut system = HandoffSystem::new();
/// system.add_queue("main", 5).unwrap();
/// system
///     .add_producer("P1", (0..10).map(|i| format!("Data-{}", i)), "main", Duration::ZERO)
///     .unwrap();
///
/// let results = Destination::new();
/// system
///     .add_consumer("C1", results.clone(), "main", Duration::ZERO, None)
///     .unwrap();
///
/// system.start().unwrap();
/// system.wait_for_completion(Some(Duration::from_secs(10))).unwrap();
/// assert_eq!(results.len(), 10);
/// ```
pub struct HandoffSystem<T> {
    tuning: SystemTuning,
    shutdown: ShutdownSignal,
    // Producers observe this child scope so they can be stopped on their own
    producer_stop: ShutdownSignal,
    state: SystemState,
    queues: Vec<Arc<HandoffQueue<T>>>,
    producers: Vec<ProducerBinding<T>>,
    consumers: Vec<ConsumerBinding<T>>,
    started: Option<(Instant, DateTime<Local>)>,
    finished: Option<(Instant, DateTime<Local>)>,
}

impl<T: Send + 'static> HandoffSystem<T> {
    pub fn new() -> Self {
        Self::with_tuning(SystemTuning::default())
    }

    pub fn with_tuning(tuning: SystemTuning) -> Self {
        Self::with_shutdown(tuning, ShutdownSignal::new())
    }

    /// Build a system whose workers observe `shutdown`.
    ///
    /// Pass a [`ShutdownSignal::child`] to let an outer signal cancel this
    /// system without this system's drain leaking back out.
    pub fn with_shutdown(tuning: SystemTuning, shutdown: ShutdownSignal) -> Self {
        Self {
            tuning,
            producer_stop: shutdown.child(),
            shutdown,
            state: SystemState::Configuring,
            queues: Vec::new(),
            producers: Vec::new(),
            consumers: Vec::new(),
            started: None,
            finished: None,
        }
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub fn tuning(&self) -> &SystemTuning {
        &self.tuning
    }

    /// Clone of the token every worker polls
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn queue(&self, name: &str) -> Option<Arc<HandoffQueue<T>>> {
        self.queues.iter().find(|q| q.name() == name).cloned()
    }

    /// Register a new bounded queue.
    pub fn add_queue(&mut self, name: &str, capacity: usize) -> SystemResult<Arc<HandoffQueue<T>>> {
        self.ensure_configuring("add a queue")?;
        if name.trim().is_empty() {
            return Err(SystemError::configuration("Queue name must not be empty"));
        }
        if capacity == 0 {
            return Err(SystemError::configuration(format!(
                "Queue '{}' must have a capacity of at least 1",
                name
            )));
        }
        if self.queue(name).is_some() {
            return Err(SystemError::configuration(format!(
                "Queue '{}' already exists",
                name
            )));
        }

        let queue = Arc::new(HandoffQueue::new(name, capacity));
        self.queues.push(Arc::clone(&queue));
        log::debug!("Registered queue '{}' (capacity {})", name, capacity);
        Ok(queue)
    }

    /// Bind a producer over `source` to the queue named `queue_name`.
    pub fn add_producer(
        &mut self,
        name: &str,
        source: impl IntoIterator<Item = T>,
        queue_name: &str,
        delay: Duration,
    ) -> SystemResult<WorkerProbe> {
        self.ensure_configuring("add a producer")?;
        let queue = self.require_queue(queue_name)?;

        let producer = Producer::new(
            name,
            source,
            queue,
            self.producer_stop.clone(),
            delay,
            self.tuning.put_timeout,
        );
        let probe = producer.probe().clone();
        self.producers.push(ProducerBinding {
            probe: probe.clone(),
            queue: queue_name.to_string(),
            source_len: producer.source_len(),
            pending: Some(producer),
            handle: None,
        });
        log::debug!("Registered producer '{}' -> '{}'", name, queue_name);
        Ok(probe)
    }

    /// Bind a consumer to one or more queues, appending into `destination`.
    pub fn add_consumer(
        &mut self,
        name: &str,
        destination: Destination<T>,
        queues: impl Into<QueueSelection>,
        delay: Duration,
        max_items: Option<usize>,
    ) -> SystemResult<WorkerProbe> {
        self.ensure_configuring("add a consumer")?;
        let selection = queues.into();
        if selection.names().is_empty() {
            return Err(SystemError::configuration(format!(
                "Consumer '{}' must be bound to at least one queue",
                name
            )));
        }
        let bound = selection
            .names()
            .iter()
            .map(|queue_name| self.require_queue(queue_name))
            .collect::<SystemResult<Vec<_>>>()?;

        let poll_timeout = self.tuning.poll_timeout_for(bound.len());
        let consumer = Consumer::new(
            name,
            bound,
            destination.clone(),
            self.shutdown.clone(),
            delay,
            max_items,
            poll_timeout,
        );
        let probe = consumer.probe().clone();
        self.consumers.push(ConsumerBinding {
            probe: probe.clone(),
            queues: selection.names().to_vec(),
            destination,
            max_items,
            pending: Some(consumer),
            handle: None,
        });
        log::debug!(
            "Registered consumer '{}' <- [{}]",
            name,
            selection.names().join(", ")
        );
        Ok(probe)
    }

    /// Launch every registered worker on its own thread.
    pub fn start(&mut self) -> SystemResult<()> {
        if self.state != SystemState::Configuring {
            return Err(SystemError::configuration(format!(
                "System already started (state: {})",
                self.state
            )));
        }

        log::info!(
            "Starting system: {} producer(s), {} consumer(s)",
            self.producers.len(),
            self.consumers.len()
        );
        self.started = Some((Instant::now(), Local::now()));
        self.state = SystemState::Running;

        if let Err(e) = self.spawn_all() {
            log::error!("Failed to start system: {}", e);
            self.shutdown.cancel();
            self.join_all(Instant::now() + self.tuning.stop_join_timeout);
            self.mark_stopped();
            return Err(e);
        }
        Ok(())
    }

    /// Run the two-phase graceful shutdown and block until `Stopped`.
    ///
    /// `timeout` bounds each phase separately. Producers still running when
    /// the first phase expires are stopped before the drain wait begins.
    /// Calling this on a stopped system is a no-op.
    pub fn wait_for_completion(&mut self, timeout: Option<Duration>) -> SystemResult<()> {
        match self.state {
            SystemState::Configuring => {
                return Err(SystemError::configuration(
                    "Cannot wait for completion before start()",
                ));
            }
            SystemState::Stopped => return Ok(()),
            SystemState::Running | SystemState::Draining => {}
        }

        let deadline = |timeout: Option<Duration>| timeout.map(|t| Instant::now() + t);

        // Phase 1: producers finish their sources (or give up)
        let producer_deadline = deadline(timeout);
        let mut producers_pending = 0usize;
        for binding in &mut self.producers {
            if let Some(handle) = binding.handle.as_mut() {
                if !handle.join_until(producer_deadline) {
                    producers_pending += 1;
                }
            }
        }
        if producers_pending > 0 {
            // A producer blocked in a push may still land that one item;
            // nothing further is taken from its source.
            log::warn!(
                "{} producer(s) still running after timeout; stopping producers",
                producers_pending
            );
            self.producer_stop.cancel();
        }

        // Phase 2: every enqueued item has been acknowledged
        let drain_deadline = deadline(timeout);
        for queue in &self.queues {
            self.await_drained(queue, drain_deadline);
        }

        // Phase 3: release consumers
        self.state = SystemState::Draining;
        self.shutdown.begin_drain();
        log::debug!("All queues drained; consumers may finish");

        // Phase 4: consumers observe their empty-poll run and leave
        let consumer_deadline = deadline(timeout);
        let mut all_joined = true;
        for binding in &mut self.consumers {
            if let Some(handle) = binding.handle.as_mut() {
                all_joined &= handle.join_until(consumer_deadline);
            }
        }
        all_joined &= self
            .producers
            .iter()
            .all(|binding| binding.handle.as_ref().map_or(true, |h| h.is_finished()));

        if !all_joined {
            log::warn!("Workers did not finish within the timeout; cancelling");
            self.shutdown.cancel();
            self.join_all(Instant::now() + self.tuning.stop_join_timeout);
        }

        self.mark_stopped();
        Ok(())
    }

    /// Cancel every worker immediately and join them under a bounded wait.
    ///
    /// Items still buffered stay in their queues. Stopping a system that was
    /// never started simply freezes it.
    pub fn stop(&mut self) -> SystemResult<()> {
        match self.state {
            SystemState::Stopped => return Ok(()),
            SystemState::Configuring => {
                log::debug!("Stopping a system that was never started");
            }
            SystemState::Running | SystemState::Draining => {
                log::info!("Stopping system");
                self.shutdown.cancel();
                self.join_all(Instant::now() + self.tuning.stop_join_timeout);
            }
        }
        self.mark_stopped();
        Ok(())
    }

    /// Snapshot of the run so far
    pub fn statistics(&self) -> SystemStatistics {
        let duration = match (self.started, self.finished) {
            (Some((start, _)), Some((end, _))) => end.duration_since(start),
            (Some((start, _)), None) => start.elapsed(),
            _ => Duration::ZERO,
        };

        let queues: Vec<_> = self.queues.iter().map(|q| q.snapshot()).collect();
        let producers: Vec<ProducerStatistics> = self
            .producers
            .iter()
            .map(|binding| ProducerStatistics {
                name: binding.probe.name().to_string(),
                queue: binding.queue.clone(),
                produced: binding.probe.processed(),
                source_len: binding.source_len,
                attempts: binding
                    .probe
                    .queue_activity()
                    .iter()
                    .map(|a| a.attempts)
                    .sum(),
                state: binding.probe.state(),
            })
            .collect();
        let consumers: Vec<ConsumerStatistics> = self
            .consumers
            .iter()
            .map(|binding| ConsumerStatistics {
                name: binding.probe.name().to_string(),
                queues: binding.probe.queue_activity(),
                consumed: binding.probe.processed(),
                destination_len: binding.destination.len(),
                max_items: binding.max_items,
                state: binding.probe.state(),
            })
            .collect();

        SystemStatistics {
            state: self.state,
            started_at: self.started.map(|(_, at)| at),
            finished_at: self.finished.map(|(_, at)| at),
            duration_secs: duration.as_secs_f64(),
            total_produced: producers.iter().map(|p| p.produced).sum(),
            total_consumed: consumers.iter().map(|c| c.consumed).sum(),
            total_remaining: queues.iter().map(|q| q.depth).sum(),
            queues,
            producers,
            consumers,
        }
    }

    pub fn print_statistics(&self) {
        println!("{}", render_statistics(&self.statistics()));
    }

    fn ensure_configuring(&self, action: &str) -> SystemResult<()> {
        if self.state == SystemState::Configuring {
            Ok(())
        } else {
            Err(SystemError::configuration(format!(
                "Cannot {} after start (state: {})",
                action, self.state
            )))
        }
    }

    fn require_queue(&self, name: &str) -> SystemResult<Arc<HandoffQueue<T>>> {
        self.queue(name)
            .ok_or_else(|| SystemError::configuration(format!("Queue '{}' not found", name)))
    }

    fn spawn_all(&mut self) -> SystemResult<()> {
        for binding in &mut self.producers {
            if let Some(producer) = binding.pending.take() {
                binding.handle = Some(spawn_worker(producer)?);
            }
        }
        for binding in &mut self.consumers {
            if let Some(consumer) = binding.pending.take() {
                binding.handle = Some(spawn_worker(consumer)?);
            }
        }
        Ok(())
    }

    /// Wait on one queue's drain barrier, giving up when nobody is left to
    /// acknowledge its items, on cancellation, or at `deadline`.
    fn await_drained(&self, queue: &HandoffQueue<T>, deadline: Option<Instant>) {
        loop {
            let slice = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        log::warn!(
                            "Queue '{}' not drained before timeout ({} unfinished)",
                            queue.name(),
                            queue.unfinished()
                        );
                        return;
                    }
                    remaining.min(self.tuning.drain_poll_interval)
                }
                None => self.tuning.drain_poll_interval,
            };

            match queue.wait_drained(slice) {
                Ok(true) => return,
                Ok(false) => {}
                Err(e) => {
                    log::error!("Drain wait on '{}' failed: {}", queue.name(), e);
                    return;
                }
            }

            if self.shutdown.is_cancelled() {
                log::debug!("Drain wait on '{}' abandoned: cancelled", queue.name());
                return;
            }
            let served = self
                .consumers
                .iter()
                .any(|c| c.is_live() && c.queues.iter().any(|q| q == queue.name()));
            if !served {
                log::info!(
                    "Queue '{}' has no live consumer; {} item(s) left unconsumed",
                    queue.name(),
                    queue.unfinished()
                );
                return;
            }
        }
    }

    fn join_all(&mut self, deadline: Instant) {
        let handles = self
            .producers
            .iter_mut()
            .filter_map(|b| b.handle.as_mut())
            .chain(self.consumers.iter_mut().filter_map(|b| b.handle.as_mut()));
        for handle in handles {
            if !handle.join_until(Some(deadline)) {
                log::error!(
                    "Worker '{}' did not stop within the join timeout",
                    handle.probe().name()
                );
            }
        }
    }

    fn mark_stopped(&mut self) {
        self.state = SystemState::Stopped;
        if self.finished.is_none() {
            self.finished = Some((Instant::now(), Local::now()));
        }
        log::info!("System stopped");
    }
}

impl<T: Send + 'static> Default for HandoffSystem<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for HandoffSystem<T> {
    fn drop(&mut self) {
        if matches!(self.state, SystemState::Running | SystemState::Draining) {
            log::debug!("HandoffSystem dropped while running; cancelling workers");
            self.shutdown.cancel();
        }
    }
}

impl<T> fmt::Debug for HandoffSystem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffSystem")
            .field("state", &self.state)
            .field("queues", &self.queues.len())
            .field("producers", &self.producers.len())
            .field("consumers", &self.consumers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests;
