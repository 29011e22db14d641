//! TOML topology file parsing and loading
//!
//! A topology file declares queues, producers and consumers plus optional
//! timeout tuning. Producers generate `"<prefix>-<i>"` payloads; consumers
//! naming the same `destination` share one destination list.

use crate::app::error::{AppError, AppResult};
use crate::core::shutdown::ShutdownSignal;
use crate::system::{HandoffSystem, SystemTuning, TuningConfig};
use crate::worker::Destination;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_PREFIX: &str = "Data";

/// Upper bound on `items` per producer; sources are materialised up front
pub const MAX_PRODUCER_ITEMS: usize = 1_000_000;

/// Default topology location: `<config dir>/handoff/topology.toml`
pub fn default_topology_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("handoff").join("topology.toml"))
}

/// Pick the explicit path, or fall back to the default location if it exists.
pub fn resolve_topology_path(explicit: Option<&Path>) -> AppResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match default_topology_path() {
        Some(path) if path.exists() => Ok(path),
        Some(path) => Err(AppError::NoTopology(path.display().to_string())),
        None => Err(AppError::NoTopology(
            "<no configuration directory>".to_string(),
        )),
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TopologyConfig {
    #[serde(default)]
    pub tuning: TuningConfig,
    #[serde(default, rename = "queue")]
    pub queues: Vec<QueueConfig>,
    #[serde(default, rename = "producer")]
    pub producers: Vec<ProducerConfig>,
    #[serde(default, rename = "consumer")]
    pub consumers: Vec<ConsumerConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    pub name: String,
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProducerConfig {
    pub name: String,
    pub queue: String,
    /// Number of payloads to generate
    pub items: usize,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConsumerConfig {
    pub name: String,
    pub queues: QueueNames,
    /// Shared destination name; defaults to the consumer's own name
    pub destination: Option<String>,
    #[serde(default)]
    pub delay_ms: u64,
    pub max_items: Option<usize>,
}

impl ConsumerConfig {
    pub fn destination_name(&self) -> &str {
        self.destination.as_deref().unwrap_or(&self.name)
    }
}

/// `queues = "a"` or `queues = ["a", "b"]`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum QueueNames {
    One(String),
    Many(Vec<String>),
}

impl QueueNames {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            QueueNames::One(name) => vec![name.clone()],
            QueueNames::Many(names) => names.clone(),
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// A built, not yet started system together with its named destinations
pub struct Topology {
    pub system: HandoffSystem<String>,
    pub destinations: BTreeMap<String, Destination<String>>,
}

impl TopologyConfig {
    /// Read, parse and validate a topology file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TopologyConfig =
            toml::from_str(&contents).map_err(|source| AppError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        log::debug!(
            "Loaded topology {}: {} queue(s), {} producer(s), {} consumer(s)",
            path.display(),
            config.queues.len(),
            config.producers.len(),
            config.consumers.len()
        );
        Ok(config)
    }

    /// Checks that do not need a built system. Name resolution and capacity
    /// rules are enforced again when the system is assembled.
    pub fn validate(&self) -> AppResult<()> {
        if self.queues.is_empty() {
            return Err(AppError::Invalid(
                "at least one [[queue]] is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for worker in self
            .producers
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.consumers.iter().map(|c| c.name.as_str()))
        {
            if !seen.insert(worker) {
                return Err(AppError::Invalid(format!(
                    "worker name '{}' is used more than once",
                    worker
                )));
            }
        }

        for producer in &self.producers {
            if producer.items == 0 {
                return Err(AppError::Invalid(format!(
                    "producer '{}' must generate at least one item",
                    producer.name
                )));
            }
            if producer.items > MAX_PRODUCER_ITEMS {
                return Err(AppError::Invalid(format!(
                    "producer '{}' asks for {} items; the limit is {}",
                    producer.name, producer.items, MAX_PRODUCER_ITEMS
                )));
            }
        }
        for consumer in &self.consumers {
            if consumer.queues.to_vec().is_empty() {
                return Err(AppError::Invalid(format!(
                    "consumer '{}' must name at least one queue",
                    consumer.name
                )));
            }
        }
        Ok(())
    }

    pub fn tuning(&self) -> SystemTuning {
        SystemTuning::from(&self.tuning)
    }

    /// Assemble a system observing `shutdown`.
    pub fn build(&self, shutdown: ShutdownSignal) -> AppResult<Topology> {
        let mut system = HandoffSystem::with_shutdown(self.tuning(), shutdown);

        for queue in &self.queues {
            system.add_queue(&queue.name, queue.capacity)?;
        }
        for producer in &self.producers {
            let prefix = producer.prefix.clone();
            let source = (0..producer.items).map(move |i| format!("{}-{}", prefix, i));
            system.add_producer(
                &producer.name,
                source,
                &producer.queue,
                Duration::from_millis(producer.delay_ms),
            )?;
        }

        let mut destinations: BTreeMap<String, Destination<String>> = BTreeMap::new();
        for consumer in &self.consumers {
            let destination = destinations
                .entry(consumer.destination_name().to_string())
                .or_default()
                .clone();
            system.add_consumer(
                &consumer.name,
                destination,
                consumer.queues.to_vec(),
                Duration::from_millis(consumer.delay_ms),
                consumer.max_items,
            )?;
        }

        Ok(Topology {
            system,
            destinations,
        })
    }
}
