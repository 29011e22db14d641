//! Helpers for building systems with short timeouts

use handoff::system::{HandoffSystem, SystemTuning};
use handoff::worker::Destination;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

pub const COMPLETION_TIMEOUT: Option<Duration> = Some(Duration::from_secs(15));

pub fn fast_tuning() -> SystemTuning {
    SystemTuning::default()
        .with_put_timeout(Duration::from_millis(500))
        .with_poll_timeout(Duration::from_millis(20))
        .with_stop_join_timeout(Duration::from_secs(3))
}

pub fn fast_system() -> HandoffSystem<String> {
    HandoffSystem::with_tuning(fast_tuning())
}

pub fn labelled(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}-{}", prefix, i)).collect()
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Destination that faults on every append
pub fn poisoned_destination() -> Destination<String> {
    let destination = Destination::new();
    let _ = catch_unwind(AssertUnwindSafe(|| {
        destination.with_items(|_| panic!("poisoning destination"))
    }));
    destination
}
