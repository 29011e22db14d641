//! Test modules for the orchestrator
//!
//! Organised by concern: topology validation, lifecycle and shutdown, and
//! statistics.


use crate::system::{HandoffSystem, SystemTuning};
use crate::worker::Destination;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

/// Tuning with short waits so failing paths resolve quickly in tests
pub(crate) fn fast_tuning() -> SystemTuning {
    SystemTuning {
        put_timeout: Duration::from_millis(200),
        poll_timeout_single: Duration::from_millis(20),
        poll_timeout_multi: Duration::from_millis(10),
        stop_join_timeout: Duration::from_secs(2),
        drain_poll_interval: Duration::from_millis(10),
    }
}

pub(crate) fn fast_system() -> HandoffSystem<String> {
    HandoffSystem::with_tuning(fast_tuning())
}

pub(crate) fn items(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}-{}", prefix, i)).collect()
}

pub(crate) const TIMEOUT: Option<Duration> = Some(Duration::from_secs(10));

/// Destination whose lock is already poisoned, so every append faults
pub(crate) fn poisoned_destination() -> Destination<String> {
    let destination = Destination::new();
    let _ = catch_unwind(AssertUnwindSafe(|| {
        destination.with_items(|_| panic!("poisoning destination"))
    }));
    destination
}
