//! Synchronization utilities for robust mutex handling
//!
//! Queues, destinations and worker probes all guard their state with
//! `std::sync::Mutex`. A worker that panics while holding one of those locks
//! poisons it; these helpers turn that poison into a typed error of the
//! caller's choosing instead of propagating the panic into other workers.

use std::sync::{Condvar, LockResult, MutexGuard, WaitTimeoutResult};
use std::time::Duration;

/// Handle poisoned mutex cases with consistent error handling
///
/// # Arguments
/// * `result` - The result from a mutex lock operation
/// * `error_constructor` - Function to create the appropriate error type
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use handoff::core::sync::handle_mutex_poison;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(mutex.lock(), |msg| msg).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). A worker panicked while holding a lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Wait on a condition variable for at most `timeout`, converting poison
/// into the caller's error type.
///
/// The guard is always handed back on success so the caller can re-check its
/// predicate; spurious wake-ups are the caller's concern.
pub fn wait_timeout_or_poison<'a, T, E>(
    condvar: &Condvar,
    guard: MutexGuard<'a, T>,
    timeout: Duration,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<(MutexGuard<'a, T>, WaitTimeoutResult), E> {
    condvar.wait_timeout(guard, timeout).map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (condvar wait on poisoned mutex). PoisonError: {:?}",
            poison_err
        ))
    })
}
