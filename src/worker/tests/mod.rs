//! Test modules for producer and consumer workers
//!
//! Workers are driven either directly through [`Worker::run`] on the test
//! thread, or through [`spawn_worker`] when thread behaviour matters.

mod spawn;

use crate::queue::{HandoffQueue, Item};
use crate::worker::Destination;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const SHORT: Duration = Duration::from_millis(20);

/// Queue pre-filled with `count` string items, ids starting at zero
pub(crate) fn filled_queue(name: &str, capacity: usize, count: usize) -> Arc<HandoffQueue<String>> {
    let queue = Arc::new(HandoffQueue::new(name, capacity));
    for i in 0..count {
        queue
            .push_timeout(Item::new(i as u64, format!("{}-{}", name, i)), SHORT)
            .expect("prefill should fit");
    }
    queue
}

/// Destination whose lock was poisoned by a panicking reader
pub(crate) fn poisoned_destination<T>() -> Destination<T> {
    let destination = Destination::new();
    let _ = catch_unwind(AssertUnwindSafe(|| {
        destination.with_items(|_| panic!("poisoning destination"))
    }));
    destination
}
