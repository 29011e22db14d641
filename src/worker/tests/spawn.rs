//! Tests for thread spawning, panic isolation and timed joins

use crate::system::{SystemError, SystemResult};
use crate::worker::{spawn_worker, Worker, WorkerExit, WorkerKind, WorkerProbe, WorkerState};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

enum Behaviour {
    Panic,
    Fail,
    Sleep(Duration),
    RecordThreadName(Arc<Mutex<Option<String>>>),
}

struct ScriptedWorker {
    probe: WorkerProbe,
    behaviour: Behaviour,
}

impl ScriptedWorker {
    fn new(name: &str, behaviour: Behaviour) -> Self {
        Self {
            probe: WorkerProbe::new(name, WorkerKind::Consumer, &["main".to_string()]),
            behaviour,
        }
    }
}

impl Worker for ScriptedWorker {
    fn name(&self) -> &str {
        self.probe.name()
    }

    fn probe(&self) -> &WorkerProbe {
        &self.probe
    }

    fn run(&mut self) -> SystemResult<WorkerExit> {
        match &self.behaviour {
            Behaviour::Panic => panic!("boom"),
            Behaviour::Fail => Err(SystemError::worker_fault(self.name(), "exploded")),
            Behaviour::Sleep(duration) => {
                thread::sleep(*duration);
                Ok(WorkerExit::DrainComplete)
            }
            Behaviour::RecordThreadName(slot) => {
                *slot.lock().unwrap() = thread::current().name().map(str::to_string);
                Ok(WorkerExit::DrainComplete)
            }
        }
    }
}

fn soon() -> Option<Instant> {
    Some(Instant::now() + Duration::from_secs(2))
}

#[test]
fn test_panic_is_contained_and_reported() {
    let mut handle = spawn_worker(ScriptedWorker::new("C1", Behaviour::Panic)).unwrap();

    assert!(handle.join_until(soon()));
    match handle.probe().state() {
        WorkerState::Failed(message) => assert_eq!(message, "panicked: boom"),
        other => panic!("expected failed state, got {}", other),
    }
}

#[test]
fn test_worker_fault_is_reported() {
    let mut handle = spawn_worker(ScriptedWorker::new("C1", Behaviour::Fail)).unwrap();

    assert!(handle.join_until(soon()));
    let state = handle.probe().state();
    assert!(state.is_terminal());
    assert_eq!(
        state,
        WorkerState::Failed("Worker 'C1' failed: exploded".to_string())
    );
}

#[test]
fn test_join_until_respects_deadline() {
    let mut handle = spawn_worker(ScriptedWorker::new(
        "slow",
        Behaviour::Sleep(Duration::from_millis(200)),
    ))
    .unwrap();

    assert!(!handle.join_until(Some(Instant::now() + Duration::from_millis(20))));
    assert_eq!(handle.probe().state(), WorkerState::Running);

    assert!(handle.join_until(None));
    assert!(handle.is_finished());
    assert_eq!(
        handle.probe().state(),
        WorkerState::Finished(WorkerExit::DrainComplete)
    );
    // Joining again is a no-op
    assert!(handle.join_until(None));
}

#[test]
fn test_unbounded_join_blocks_until_exit() {
    let mut handle = spawn_worker(ScriptedWorker::new(
        "slow",
        Behaviour::Sleep(Duration::from_millis(100)),
    ))
    .unwrap();

    let started = Instant::now();
    assert!(handle.join_until(None));

    assert!(started.elapsed() >= Duration::from_millis(90));
    assert!(handle.is_finished());
    // The outcome is recorded before the thread exits
    assert_eq!(
        handle.probe().state(),
        WorkerState::Finished(WorkerExit::DrainComplete)
    );
}

#[test]
fn test_thread_is_named_after_worker() {
    let slot = Arc::new(Mutex::new(None));
    let mut handle = spawn_worker(ScriptedWorker::new(
        "sensor-reader",
        Behaviour::RecordThreadName(Arc::clone(&slot)),
    ))
    .unwrap();

    assert!(handle.join_until(soon()));
    assert_eq!(slot.lock().unwrap().as_deref(), Some("sensor-reader"));
}

#[test]
fn test_probe_starts_idle() {
    let worker = ScriptedWorker::new("C1", Behaviour::Fail);
    assert_eq!(worker.probe().state(), WorkerState::Idle);
    assert_eq!(worker.probe().kind(), WorkerKind::Consumer);
    assert_eq!(worker.probe().processed(), 0);
}
