//! Timeouts governing every bounded wait in the system

use serde::Deserialize;
use std::time::Duration;

/// Bounded-wait configuration shared by all workers of one system
///
/// Every blocking operation in the engine is bounded by one of these values,
/// which is what guarantees that the system always reaches `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemTuning {
    /// Longest a producer waits on a full queue before giving up
    pub put_timeout: Duration,
    /// Per-poll wait for a consumer bound to a single queue
    pub poll_timeout_single: Duration,
    /// Per-poll wait for a consumer bound to several queues
    pub poll_timeout_multi: Duration,
    /// Join budget used by `stop()` and by escalation after a timed-out wait
    pub stop_join_timeout: Duration,
    /// Re-check interval while waiting on a queue's drain barrier
    pub drain_poll_interval: Duration,
}

impl Default for SystemTuning {
    fn default() -> Self {
        Self {
            put_timeout: Duration::from_secs(5),
            poll_timeout_single: Duration::from_secs(1),
            poll_timeout_multi: Duration::from_millis(100),
            stop_join_timeout: Duration::from_secs(5),
            drain_poll_interval: Duration::from_millis(50),
        }
    }
}

impl SystemTuning {
    /// Poll timeout for a consumer bound to `queue_count` queues
    pub fn poll_timeout_for(&self, queue_count: usize) -> Duration {
        if queue_count <= 1 {
            self.poll_timeout_single
        } else {
            self.poll_timeout_multi
        }
    }

    pub fn with_put_timeout(mut self, timeout: Duration) -> Self {
        self.put_timeout = timeout;
        self
    }

    /// Use the same poll timeout for single- and multi-queue consumers
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout_single = timeout;
        self.poll_timeout_multi = timeout;
        self
    }

    pub fn with_stop_join_timeout(mut self, timeout: Duration) -> Self {
        self.stop_join_timeout = timeout;
        self
    }
}

/// Millisecond form of [`SystemTuning`] as written in topology files
///
/// Missing keys fall back to the defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TuningConfig {
    pub put_timeout_ms: Option<u64>,
    pub poll_timeout_single_ms: Option<u64>,
    pub poll_timeout_multi_ms: Option<u64>,
    pub stop_join_timeout_ms: Option<u64>,
    pub drain_poll_interval_ms: Option<u64>,
}

impl From<&TuningConfig> for SystemTuning {
    fn from(config: &TuningConfig) -> Self {
        let defaults = SystemTuning::default();
        let pick = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_millis).unwrap_or(fallback)
        };
        SystemTuning {
            put_timeout: pick(config.put_timeout_ms, defaults.put_timeout),
            poll_timeout_single: pick(config.poll_timeout_single_ms, defaults.poll_timeout_single),
            poll_timeout_multi: pick(config.poll_timeout_multi_ms, defaults.poll_timeout_multi),
            stop_join_timeout: pick(config.stop_join_timeout_ms, defaults.stop_join_timeout),
            drain_poll_interval: pick(config.drain_poll_interval_ms, defaults.drain_poll_interval),
        }
    }
}
