//! Shutdown Coordination
//!
//! A single [`ShutdownSignal`] is created per system and cloned into every
//! worker at construction. Workers poll it at loop boundaries only; nothing is
//! interrupted preemptively, so cancellation latency is bounded by the
//! per-operation timeout of whatever the worker is currently waiting on.
//!
//! The signal moves forward only:
//!
//! ```text
//! Running ──► Draining ──► Cancelled
//!    └─────────────────────────▲
//! ```
//!
//! * `Draining` is the graceful phase: producers stop injecting, consumers keep
//!   pulling until they observe a run of empty polls.
//! * `Cancelled` is immediate: every worker leaves at its next loop boundary.
//!
//! [`ShutdownSignal::child`] derives a token that also observes its parent, so
//! a process-wide signal can cancel any number of independently owned systems.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const DRAINING: u8 = 1;
const CANCELLED: u8 = 2;

/// Observable phase of a [`ShutdownSignal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownPhase {
    Running,
    Draining,
    Cancelled,
}

impl fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownPhase::Running => "running",
            ShutdownPhase::Draining => "draining",
            ShutdownPhase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Shared cooperative cancellation token
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    phase: Arc<AtomicU8>,
    // Phases of every ancestor; the effective phase is the maximum
    ancestors: Vec<Arc<AtomicU8>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            phase: Arc::new(AtomicU8::new(RUNNING)),
            ancestors: Vec::new(),
        }
    }

    /// Derive a token that follows this one.
    ///
    /// Advancing the parent is visible through the child; advancing the child
    /// leaves the parent untouched.
    pub fn child(&self) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(Arc::clone(&self.phase));
        Self {
            phase: Arc::new(AtomicU8::new(RUNNING)),
            ancestors,
        }
    }

    /// Request a graceful drain. Has no effect once cancelled.
    pub fn begin_drain(&self) {
        self.advance_to(DRAINING);
    }

    /// Request immediate cancellation.
    pub fn cancel(&self) {
        self.advance_to(CANCELLED);
    }

    /// True once any shutdown has been requested (drain or cancel)
    pub fn is_shutdown_requested(&self) -> bool {
        self.load() != RUNNING
    }

    pub fn is_cancelled(&self) -> bool {
        self.load() == CANCELLED
    }

    pub fn phase(&self) -> ShutdownPhase {
        match self.load() {
            RUNNING => ShutdownPhase::Running,
            DRAINING => ShutdownPhase::Draining,
            _ => ShutdownPhase::Cancelled,
        }
    }

    fn load(&self) -> u8 {
        // Acquire pairs with the AcqRel in advance_to
        self.ancestors
            .iter()
            .map(|phase| phase.load(Ordering::Acquire))
            .fold(self.phase.load(Ordering::Acquire), u8::max)
    }

    fn advance_to(&self, target: u8) {
        // fetch_max keeps the phase monotonic under concurrent requests
        self.phase.fetch_max(target, Ordering::AcqRel);
    }
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("phase", &self.phase())
            .finish()
    }
}

/// Cancel `signal` when the process receives a termination signal.
///
/// Must be called from within a tokio runtime. The first signal cancels the
/// system cooperatively; a second one forces the process to exit with 130.
pub fn install_signal_handlers(signal: ShutdownSignal) {
    use std::sync::atomic::AtomicUsize;

    let signal_count = Arc::new(AtomicUsize::new(0));

    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        use tokio::signal::unix::{signal as unix_signal, SignalKind};
        let kinds = [
            SignalKind::interrupt(),
            SignalKind::terminate(),
            SignalKind::hangup(),
            SignalKind::quit(),
        ];

        for kind in kinds {
            let shutdown = signal.clone();
            let sig_ctr = signal_count.clone();

            tokio::spawn(async move {
                if let Ok(mut sig) = unix_signal(kind) {
                    while sig.recv().await.is_some() {
                        on_signal(&shutdown, &sig_ctr);
                    }
                }
            });
        }
    }

    #[cfg(not(unix))]
    {
        let shutdown = signal.clone();
        let sig_ctr = signal_count.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                on_signal(&shutdown, &sig_ctr);
            }
        });
    }
}

fn on_signal(shutdown: &ShutdownSignal, counter: &std::sync::atomic::AtomicUsize) {
    let prev = counter.fetch_add(1, Ordering::AcqRel);
    if prev >= 1 {
        log::warn!("Second termination signal received; exiting");
        std::process::exit(130);
    }
    log::warn!("Termination signal received; cancelling workers (repeat to force exit)");
    shutdown.cancel();
}
