//! Producer and consumer workers
//!
//! A worker is a plain state/behaviour value implementing [`Worker`]; it knows
//! nothing about threads. [`spawn_worker`] runs one on a dedicated OS thread
//! named after the worker, isolates panics, and records how the run ended in
//! the worker's [`WorkerProbe`].
//!
//! Probes are the read side: cheap clones shared between the worker thread and
//! whoever wants statistics. Counters only grow, so a snapshot taken while the
//! worker is live is a lower bound of the final value.

mod consumer;
mod destination;
mod producer;

pub use consumer::{Consumer, RoundRobin};
pub use destination::Destination;
pub use producer::Producer;

use crate::system::{SystemError, SystemResult};
use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A unit of concurrent work with a single run entry point
pub trait Worker: Send + 'static {
    fn name(&self) -> &str;

    fn probe(&self) -> &WorkerProbe;

    /// Execute the worker loop to completion on the calling thread.
    fn run(&mut self) -> SystemResult<WorkerExit>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    Producer,
    Consumer,
}

/// Why a worker loop ended normally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerExit {
    /// Producer enqueued every element of its source
    SourceExhausted,
    /// Producer observed the shutdown signal before exhausting its source
    ShutdownRequested,
    /// Producer gave up after one bounded wait on a full queue
    Backpressure,
    /// Consumer reached its configured `max_items`
    MaxItemsReached,
    /// Consumer saw shutdown plus a full run of empty polls
    DrainComplete,
    /// Immediate cancellation observed at a loop boundary
    Cancelled,
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            WorkerExit::SourceExhausted => "source exhausted",
            WorkerExit::ShutdownRequested => "shutdown requested",
            WorkerExit::Backpressure => "backpressure timeout",
            WorkerExit::MaxItemsReached => "max items reached",
            WorkerExit::DrainComplete => "drain complete",
            WorkerExit::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum WorkerState {
    /// Registered but not yet started
    Idle,
    Running,
    Finished(WorkerExit),
    /// Aborted by a worker fault (error or panic)
    Failed(String),
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Finished(_) | WorkerState::Failed(_))
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Idle => f.write_str("idle"),
            WorkerState::Running => f.write_str("running"),
            WorkerState::Finished(exit) => write!(f, "finished ({})", exit),
            WorkerState::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

/// Attempt/success counters for one queue a worker is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueActivity {
    pub queue: String,
    /// Push (producer) or pop (consumer) attempts
    pub attempts: u64,
    /// Attempts that moved an item
    pub hits: u64,
}

#[derive(Debug)]
struct QueueCounters {
    queue: String,
    attempts: AtomicU64,
    hits: AtomicU64,
}

#[derive(Debug)]
struct ProbeInner {
    name: String,
    kind: WorkerKind,
    processed: AtomicU64,
    queues: Vec<QueueCounters>,
    state: Mutex<WorkerState>,
}

/// Shared, thread-safe view of one worker's progress
#[derive(Debug, Clone)]
pub struct WorkerProbe {
    inner: Arc<ProbeInner>,
}

impl WorkerProbe {
    pub fn new(name: impl Into<String>, kind: WorkerKind, queues: &[String]) -> Self {
        Self {
            inner: Arc::new(ProbeInner {
                name: name.into(),
                kind,
                processed: AtomicU64::new(0),
                queues: queues
                    .iter()
                    .map(|queue| QueueCounters {
                        queue: queue.clone(),
                        attempts: AtomicU64::new(0),
                        hits: AtomicU64::new(0),
                    })
                    .collect(),
                state: Mutex::new(WorkerState::Idle),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn kind(&self) -> WorkerKind {
        self.inner.kind
    }

    /// Items produced (producer) or consumed (consumer) so far
    pub fn processed(&self) -> u64 {
        self.inner.processed.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WorkerState {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn queue_activity(&self) -> Vec<QueueActivity> {
        self.inner
            .queues
            .iter()
            .map(|counters| QueueActivity {
                queue: counters.queue.clone(),
                attempts: counters.attempts.load(Ordering::Acquire),
                hits: counters.hits.load(Ordering::Acquire),
            })
            .collect()
    }

    pub(crate) fn record_attempt(&self, queue_index: usize) {
        if let Some(counters) = self.inner.queues.get(queue_index) {
            counters.attempts.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub(crate) fn record_hit(&self, queue_index: usize) {
        if let Some(counters) = self.inner.queues.get(queue_index) {
            counters.hits.fetch_add(1, Ordering::AcqRel);
        }
        self.inner.processed.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        let mut guard = self
            .inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = state;
    }

    fn record_outcome(&self, outcome: thread::Result<SystemResult<WorkerExit>>) {
        let state = match outcome {
            Ok(Ok(exit)) => WorkerState::Finished(exit),
            Ok(Err(SystemError::BackpressureTimeout {
                producer,
                queue,
                waited,
            })) => {
                log::warn!(
                    "[{}] Queue '{}' stayed full for {:?}; abandoning remaining items",
                    producer,
                    queue,
                    waited
                );
                WorkerState::Finished(WorkerExit::Backpressure)
            }
            Ok(Err(error)) => {
                log::error!("[{}] Worker fault: {}", self.name(), error);
                WorkerState::Failed(error.to_string())
            }
            Err(panic_payload) => {
                let message = panic_message(panic_payload.as_ref());
                log::error!("[{}] Worker panicked: {}", self.name(), message);
                WorkerState::Failed(format!("panicked: {}", message))
            }
        };
        self.set_state(state);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Owner of a spawned worker thread
#[derive(Debug)]
pub struct WorkerHandle {
    probe: WorkerProbe,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn probe(&self) -> &WorkerProbe {
        &self.probe
    }

    /// True once the worker thread has exited (or was already joined)
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |join| join.is_finished())
    }

    /// Join the thread if it finishes before `deadline` (no deadline waits
    /// indefinitely). Returns whether the thread has been joined.
    pub fn join_until(&mut self, deadline: Option<Instant>) -> bool {
        let Some(deadline) = deadline else {
            if let Some(join) = self.join.take() {
                let _ = join.join();
            }
            return true;
        };
        loop {
            if self.is_finished() {
                if let Some(join) = self.join.take() {
                    // Panics are caught inside the thread, so join cannot fail
                    // with anything we have not already recorded.
                    let _ = join.join();
                }
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(JOIN_POLL_INTERVAL);
        }
    }
}

/// Launch `worker` on its own named OS thread.
pub fn spawn_worker<W: Worker>(mut worker: W) -> SystemResult<WorkerHandle> {
    let name = worker.name().to_string();
    let probe = worker.probe().clone();
    let thread_probe = probe.clone();

    probe.set_state(WorkerState::Running);
    let join = thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| worker.run()));
            thread_probe.record_outcome(outcome);
        })
        .map_err(|source| {
            probe.set_state(WorkerState::Failed(format!("spawn failed: {}", source)));
            SystemError::Spawn {
                worker: name.clone(),
                source,
            }
        })?;

    Ok(WorkerHandle {
        probe,
        join: Some(join),
    })
}

#[cfg(test)]
mod tests;
