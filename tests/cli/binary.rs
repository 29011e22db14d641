//! Tests that drive the compiled binary

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn handoff(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_handoff"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to launch handoff binary")
}

fn topology_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_demo_basic_json_output() {
    let output = handoff(&[
        "--no-color",
        "-l",
        "warn",
        "demo",
        "basic",
        "--delay-scale",
        "0",
        "--json",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reports[0]["demo"], "basic");
    assert_eq!(reports[0]["statistics"]["total_consumed"], 20);
    assert_eq!(reports[0]["statistics"]["state"], "stopped");
    assert_eq!(reports[0]["destinations"][0]["sample"][0], "Data-0");
}

#[test]
fn test_demo_table_output() {
    let output = handoff(&["--no-color", "-l", "off", "demo", "multi-queue", "--delay-scale", "0"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--- Demo: Multiple Queues (Fan-in) ---"));
    assert!(stdout.contains("--- Stats ---"));
    assert!(stdout.contains("aggregated: 15 items"));
}

#[test]
fn test_run_topology_file() {
    let file = topology_file(
        r#"
        [tuning]
        poll_timeout_single_ms = 20

        [[queue]]
        name = "main"
        capacity = 3

        [[producer]]
        name = "P1"
        queue = "main"
        items = 8
        prefix = "job"

        [[consumer]]
        name = "C1"
        queues = "main"
        destination = "done"
        "#,
    );
    let path = file.path().to_str().unwrap();

    let output = handoff(&["-l", "off", "--json", "run", "--topology", path]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["statistics"]["total_produced"], 8);
    assert_eq!(report["destinations"][0]["name"], "done");
    assert_eq!(report["destinations"][0]["len"], 8);
    assert_eq!(report["destinations"][0]["sample"][0], "job-0");
}

#[test]
fn test_invalid_topology_exits_with_failure() {
    let file = topology_file("[[queue]]\nname = \"main\"\ncapacity = 0\n");
    let path = file.path().to_str().unwrap();

    let output = handoff(&["--no-color", "run", "--topology", path]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("capacity of at least 1"), "stderr: {}", stderr);
}

#[test]
fn test_missing_topology_file_exits_with_failure() {
    let output = handoff(&["--no-color", "run", "--topology", "/definitely/not/here.toml"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("/definitely/not/here.toml"));
}

#[test]
fn test_usage_error_exits_with_two() {
    let output = handoff(&["demo", "nonsense"]);
    assert_eq!(output.status.code(), Some(2));
}
