//! Binary entry point
//!
//! Parses arguments, installs logging and signal handling, then runs the
//! requested command on a blocking thread so the tokio runtime stays free to
//! deliver termination signals.

use crate::app::cli::args::{Args, Command};
use crate::app::cli::config::{resolve_topology_path, TopologyConfig};
use crate::app::demos::{run_demos, DemoOptions, DemoReport, DestinationSummary};
use crate::app::error::{AppError, AppResult};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::{install_signal_handlers, ShutdownSignal};
use crate::system::{render_statistics, SystemStatistics};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use std::io::IsTerminal;

const SAMPLE_SIZE: usize = 3;

/// Run the application and return the process exit code.
pub fn startup() -> i32 {
    let args = Args::parse();

    let use_color = !args.no_color && std::io::stdout().is_terminal();
    colored::control::set_override(use_color);

    let log_file = args.log_file.as_ref().map(|p| p.to_string_lossy().to_string());
    if let Err(e) = init_logging(
        args.log_level.as_deref(),
        args.log_format.as_deref(),
        log_file.as_deref(),
        use_color && log_file.is_none(),
    ) {
        eprintln!("Error: failed to initialise logging: {}", e);
        return 1;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            return 1;
        }
    };

    runtime.block_on(async move {
        let shutdown = ShutdownSignal::new();
        install_signal_handlers(shutdown.clone());

        let task = tokio::task::spawn_blocking(move || execute(&args, &shutdown));
        match task.await {
            Ok(Ok(())) => 0,
            Ok(Err(e)) => {
                log_error_with_context(&e, &format!("Run failed: {}", e));
                1
            }
            Err(e) => {
                log::error!("Command thread failed: {}", e);
                1
            }
        }
    })
}

/// Execute the parsed command against `shutdown`.
pub fn execute(args: &Args, shutdown: &ShutdownSignal) -> AppResult<()> {
    match &args.command {
        Command::Demo { name, delay_scale } => {
            let mut options = DemoOptions::new(shutdown.clone());
            options.delay_scale = *delay_scale;
            options.timeout = args.timeout;

            let reports = run_demos(*name, &options)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    print_demo_report(report);
                }
            }
        }
        Command::Run { topology } => {
            let path = resolve_topology_path(topology.as_deref())?;
            let config = TopologyConfig::load(&path)?;
            let mut topology = config.build(shutdown.child())?;

            topology.system.start()?;
            topology.system.wait_for_completion(args.timeout)?;

            let report = RunReport {
                topology: path.display().to_string(),
                statistics: topology.system.statistics(),
                destinations: topology
                    .destinations
                    .iter()
                    .map(|(name, d)| DestinationSummary::of(name, d, SAMPLE_SIZE))
                    .collect(),
            };
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report.statistics, &report.destinations);
            }
        }
    }

    if shutdown.is_cancelled() {
        return Err(AppError::Cancelled);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RunReport {
    topology: String,
    statistics: SystemStatistics,
    destinations: Vec<DestinationSummary>,
}

fn print_demo_report(report: &DemoReport) {
    println!(
        "\n{}",
        format!("--- Demo: {} ---", report.title).bold().green()
    );
    print_summary(&report.statistics, &report.destinations);
}

fn print_summary(statistics: &SystemStatistics, destinations: &[DestinationSummary]) {
    print!("{}", render_statistics(statistics));
    println!();
    for destination in destinations {
        println!(
            "{}: {} items, sample {:?}",
            destination.name.cyan(),
            destination.len,
            destination.sample
        );
    }
}
