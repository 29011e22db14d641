//! Tests for `execute` with parsed arguments

use clap::Parser;
use handoff::app::cli::args::Args;
use handoff::app::error::AppError;
use handoff::app::startup::execute;
use handoff::core::shutdown::ShutdownSignal;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_execute_run_with_unknown_queue_is_configuration_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[[queue]]\nname = \"main\"\ncapacity = 2\n\n[[producer]]\nname = \"P1\"\nqueue = \"elsewhere\"\nitems = 3"
    )
    .unwrap();
    let args = Args::try_parse_from([
        "handoff",
        "run",
        "--topology",
        file.path().to_str().unwrap(),
    ])
    .unwrap();

    let error = execute(&args, &ShutdownSignal::new()).unwrap_err();
    match error {
        AppError::System(e) => assert!(e.is_configuration()),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_execute_demo_reports_cancellation() {
    let args = Args::try_parse_from(["handoff", "--json", "demo", "basic", "--delay-scale", "0"])
        .unwrap();
    let signal = ShutdownSignal::new();
    signal.cancel();

    let error = execute(&args, &signal).unwrap_err();
    assert!(matches!(error, AppError::Cancelled));
}
