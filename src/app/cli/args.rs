//! Command-line arguments
//!
//! Global options (logging, colour, output format, completion timeout) are
//! accepted before or after the subcommand.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "handoff")]
#[command(about = "Bounded producer-consumer hand-off engine")]
#[command(version)]
pub struct Args {
    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", global = true,
          value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", global = true,
          value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(short = 'f', long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Print final statistics as JSON instead of a table
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Per-phase completion timeout in seconds
    #[arg(short = 't', long = "timeout", value_name = "SECS", global = true,
          value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run one or all of the canonical demo scenarios
    Demo {
        #[arg(value_enum, default_value_t = DemoName::All)]
        name: DemoName,

        /// Multiply every producer and consumer delay by this factor (0 disables delays)
        #[arg(long = "delay-scale", value_name = "FACTOR", default_value_t = 1.0,
              value_parser = parse_delay_scale)]
        delay_scale: f64,
    },
    /// Run a topology described in a TOML file
    Run {
        /// Topology file (defaults to <config dir>/handoff/topology.toml)
        #[arg(short = 'c', long = "topology", value_name = "FILE")]
        topology: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoName {
    /// One producer, one consumer, capacity 5
    Basic,
    /// Three producers and two capped consumers sharing one queue
    FanIn,
    /// Fast producer against a slow consumer on a capacity-3 queue
    Backpressure,
    /// One consumer aggregating three sensor queues
    MultiQueue,
    All,
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("timeout must be a positive number of seconds, got {}", value));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn parse_delay_scale(value: &str) -> Result<f64, String> {
    let factor: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !factor.is_finite() || factor < 0.0 {
        return Err(format!("delay scale must be zero or positive, got {}", value));
    }
    Ok(factor)
}
