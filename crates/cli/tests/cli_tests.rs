//! CLI integration tests

use std::process::{Command, Output};

fn emon(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_emon"))
        .args(args)
        .env_remove("EMON_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = emon(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Industrial Energy Monitor"),
        "Should show app name"
    );
    for command in ["ingest", "simulation", "alerts", "ack", "summary", "devices", "readings", "health"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = emon(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("emon"), "Should show binary name");
}

#[test]
fn test_simulation_help_lists_actions() {
    let output = emon(&["simulation", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("start"));
    assert!(stdout.contains("stop"));
    assert!(stdout.contains("status"));
}

#[test]
fn test_alerts_help_shows_filters() {
    let output = emon(&["alerts", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--device"), "Should show device option");
    assert!(
        stdout.contains("--unacknowledged"),
        "Should show unacknowledged option"
    );
}

#[test]
fn test_global_options_in_help() {
    let output = emon(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("EMON_API_URL"), "Should mention env var");
    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("--verbose"), "Should show verbose option");
}

#[test]
fn test_invalid_format_rejected() {
    let output = emon(&["--format", "yaml", "devices"]);
    assert!(!output.status.success(), "Unknown format should fail");
}

#[test]
fn test_invalid_command() {
    let output = emon(&["frobnicate"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Invalid command should fail");
    assert!(
        stderr.contains("error") || stderr.contains("unrecognized"),
        "Should show error message"
    );
}

#[test]
fn test_ack_missing_argument() {
    let output = emon(&["ack"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Missing argument should fail");
    assert!(stderr.contains("required"), "Should mention the missing argument");
}

#[test]
fn test_ack_rejects_malformed_id_before_network() {
    let output = emon(&["--api-url", "http://127.0.0.1:9", "ack", "not-a-uuid"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("not a valid alert id"));
}

#[test]
fn test_ingest_missing_file() {
    let output = emon(&[
        "--api-url",
        "http://127.0.0.1:9",
        "ingest",
        "/nonexistent/readings.json",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Failed to read"));
}
