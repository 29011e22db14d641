//! Canonical demo scenarios
//!
//! Each demo builds its own system on a child of the application's shutdown
//! signal, runs it to completion, and reports statistics together with a
//! summary of every destination.

use crate::app::cli::args::DemoName;
use crate::app::error::AppResult;
use crate::core::shutdown::ShutdownSignal;
use crate::system::{HandoffSystem, SystemStatistics, SystemTuning};
use crate::worker::Destination;
use serde::Serialize;
use std::thread;
use std::time::Duration;

/// Pause between consecutive demos at delay scale 1.0
const DEMO_PAUSE: Duration = Duration::from_secs(1);
const SAMPLE_SIZE: usize = 3;

#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Factor applied to every configured delay
    pub delay_scale: f64,
    pub timeout: Option<Duration>,
    pub tuning: SystemTuning,
    pub shutdown: ShutdownSignal,
}

impl DemoOptions {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            delay_scale: 1.0,
            timeout: None,
            tuning: SystemTuning::default(),
            shutdown,
        }
    }

    fn delay(&self, millis: u64) -> Duration {
        Duration::from_millis(millis).mul_f64(self.delay_scale)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DestinationSummary {
    pub name: String,
    pub len: usize,
    /// First few payloads in consumption order
    pub sample: Vec<String>,
}

impl DestinationSummary {
    pub fn of(name: &str, destination: &Destination<String>, sample_size: usize) -> Self {
        destination.with_items(|items| DestinationSummary {
            name: name.to_string(),
            len: items.len(),
            sample: items
                .iter()
                .take(sample_size)
                .map(|item| item.payload().clone())
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub demo: String,
    pub title: String,
    pub statistics: SystemStatistics,
    pub destinations: Vec<DestinationSummary>,
}

impl DemoName {
    pub fn title(self) -> &'static str {
        match self {
            DemoName::Basic => "Basic Pattern",
            DemoName::FanIn => "Multiple Producers and Consumers",
            DemoName::Backpressure => "Fast Producer, Slow Consumer",
            DemoName::MultiQueue => "Multiple Queues (Fan-in)",
            DemoName::All => "All Demos",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            DemoName::Basic => "basic",
            DemoName::FanIn => "fan-in",
            DemoName::Backpressure => "backpressure",
            DemoName::MultiQueue => "multi-queue",
            DemoName::All => "all",
        }
    }

    fn expand(self) -> Vec<DemoName> {
        match self {
            DemoName::All => vec![
                DemoName::Basic,
                DemoName::FanIn,
                DemoName::Backpressure,
                DemoName::MultiQueue,
            ],
            single => vec![single],
        }
    }
}

/// Run `name` (or every demo for [`DemoName::All`]) in order.
///
/// Stops early, returning the reports gathered so far, once the shutdown
/// signal has been cancelled.
pub fn run_demos(name: DemoName, options: &DemoOptions) -> AppResult<Vec<DemoReport>> {
    let mut reports = Vec::new();

    for (index, demo) in name.expand().into_iter().enumerate() {
        if options.shutdown.is_cancelled() {
            log::warn!("Cancelled; skipping remaining demos");
            break;
        }
        if index > 0 {
            thread::sleep(DEMO_PAUSE.mul_f64(options.delay_scale));
        }
        reports.push(run_demo(demo, options)?);
    }
    Ok(reports)
}

/// Run a single demo to completion.
pub fn run_demo(demo: DemoName, options: &DemoOptions) -> AppResult<DemoReport> {
    log::info!("Demo '{}': {}", demo.slug(), demo.title());

    let mut system = HandoffSystem::with_shutdown(options.tuning, options.shutdown.child());
    let destinations = match demo {
        DemoName::Basic => build_basic(&mut system, options)?,
        DemoName::FanIn => build_fan_in(&mut system, options)?,
        DemoName::Backpressure => build_backpressure(&mut system, options)?,
        DemoName::MultiQueue | DemoName::All => build_multi_queue(&mut system, options)?,
    };

    system.start()?;
    system.wait_for_completion(options.timeout)?;

    Ok(DemoReport {
        demo: demo.slug().to_string(),
        title: demo.title().to_string(),
        statistics: system.statistics(),
        destinations: destinations
            .iter()
            .map(|(name, destination)| DestinationSummary::of(name, destination, SAMPLE_SIZE))
            .collect(),
    })
}

type Destinations = Vec<(String, Destination<String>)>;

fn labelled(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}-{}", prefix, i)).collect()
}

fn build_basic(system: &mut HandoffSystem<String>, options: &DemoOptions) -> AppResult<Destinations> {
    system.add_queue("main", 5)?;
    system.add_producer("Producer-1", labelled("Data", 20), "main", options.delay(100))?;

    let destination = Destination::new();
    system.add_consumer(
        "Consumer-1",
        destination.clone(),
        "main",
        options.delay(150),
        None,
    )?;
    Ok(vec![("destination".to_string(), destination)])
}

fn build_fan_in(system: &mut HandoffSystem<String>, options: &DemoOptions) -> AppResult<Destinations> {
    system.add_queue("main", 15)?;
    for (name, prefix, delay) in [
        ("Producer-1", "P1-Data", 50),
        ("Producer-2", "P2-Data", 80),
        ("Producer-3", "P3-Data", 60),
    ] {
        system.add_producer(name, labelled(prefix, 10), "main", options.delay(delay))?;
    }

    let first = Destination::new();
    let second = Destination::new();
    system.add_consumer("Consumer-1", first.clone(), "main", options.delay(100), Some(15))?;
    system.add_consumer("Consumer-2", second.clone(), "main", options.delay(120), Some(15))?;
    Ok(vec![
        ("destination-1".to_string(), first),
        ("destination-2".to_string(), second),
    ])
}

fn build_backpressure(
    system: &mut HandoffSystem<String>,
    options: &DemoOptions,
) -> AppResult<Destinations> {
    system.add_queue("main", 3)?;
    system.add_producer("FastProducer", labelled("FastData", 15), "main", options.delay(20))?;

    let destination = Destination::new();
    system.add_consumer(
        "SlowConsumer",
        destination.clone(),
        "main",
        options.delay(200),
        None,
    )?;
    Ok(vec![("destination".to_string(), destination)])
}

fn build_multi_queue(
    system: &mut HandoffSystem<String>,
    options: &DemoOptions,
) -> AppResult<Destinations> {
    let sensors = [
        ("sensor1", "Producer-S1", "Sensor1", 50),
        ("sensor2", "Producer-S2", "Sensor2", 70),
        ("sensor3", "Producer-S3", "Sensor3", 60),
    ];
    for (queue, producer, prefix, delay) in sensors {
        system.add_queue(queue, 5)?;
        system.add_producer(producer, labelled(prefix, 5), queue, options.delay(delay))?;
    }

    let aggregated = Destination::new();
    system.add_consumer(
        "Aggregator",
        aggregated.clone(),
        ["sensor1", "sensor2", "sensor3"],
        options.delay(80),
        None,
    )?;
    Ok(vec![("aggregated".to_string(), aggregated)])
}
