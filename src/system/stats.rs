//! Statistics snapshots
//!
//! Built from worker probes and queue snapshots. While workers are live the
//! numbers are a best-effort lower bound; once every worker has been joined
//! they are exact.

use crate::queue::QueueSnapshot;
use crate::system::SystemState;
use crate::worker::{QueueActivity, WorkerState};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct ProducerStatistics {
    pub name: String,
    pub queue: String,
    pub produced: u64,
    /// Elements the source held when the producer was registered
    pub source_len: usize,
    pub attempts: u64,
    pub state: WorkerState,
}

impl ProducerStatistics {
    /// True if the producer stopped before its source was exhausted
    pub fn is_short(&self) -> bool {
        (self.produced as usize) < self.source_len
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsumerStatistics {
    pub name: String,
    /// Per bound queue, in round-robin order
    pub queues: Vec<QueueActivity>,
    pub consumed: u64,
    /// Items in the (possibly shared) destination
    pub destination_len: usize,
    pub max_items: Option<usize>,
    pub state: WorkerState,
}

/// Aggregate view of one system run
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatistics {
    pub state: SystemState,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
    /// Elapsed so far while running; zero before start
    pub duration_secs: f64,
    pub total_produced: u64,
    pub total_consumed: u64,
    /// Items still buffered across all queues
    pub total_remaining: usize,
    pub queues: Vec<QueueSnapshot>,
    pub producers: Vec<ProducerStatistics>,
    pub consumers: Vec<ConsumerStatistics>,
}

impl SystemStatistics {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn queue(&self, name: &str) -> Option<&QueueSnapshot> {
        self.queues.iter().find(|q| q.name == name)
    }

    pub fn producer(&self, name: &str) -> Option<&ProducerStatistics> {
        self.producers.iter().find(|p| p.name == name)
    }

    pub fn consumer(&self, name: &str) -> Option<&ConsumerStatistics> {
        self.consumers.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for SystemStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Duration: {:.2}s", self.duration_secs)?;
        write!(
            f,
            "Produced: {}, Consumed: {}",
            self.total_produced, self.total_consumed
        )?;
        if self.total_remaining > 0 {
            write!(f, "\nRemaining in queues: {}", self.total_remaining)?;
        }
        if self.producers.len() > 1 {
            for producer in &self.producers {
                write!(
                    f,
                    "\n  {}: {}/{}",
                    producer.name, producer.produced, producer.source_len
                )?;
            }
        }
        if self.consumers.len() > 1 {
            for consumer in &self.consumers {
                write!(f, "\n  {}: {}", consumer.name, consumer.consumed)?;
            }
        }
        Ok(())
    }
}
