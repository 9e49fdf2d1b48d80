//! Runs the `climate-load` binary end to end.

use std::process::{Command, Output};

/// Binary with a clean environment, so local `DB_*` or `RUST_LOG` settings
/// do not leak into the run.
fn climate_load(args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_climate-load"));
    for var in [
        "DB_HOST",
        "DB_PORT",
        "DB_USER",
        "DB_PASSWORD",
        "DB_NAME",
        "RUST_LOG",
        "OTEL_EXPORTER_OTLP_ENDPOINT",
        "OTEL_SERVICE_NAME",
    ] {
        command.env_remove(var);
    }
    command.args(args).output().unwrap()
}

#[test]
fn test_dry_run_exits_zero() {
    let output = climate_load(&["--dry-run", "--no-otel"]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Tasks: 15 succeeded, 0 failed"));
    assert!(stdout.contains("Rows inserted: 5"));
    assert_eq!(stdout.matches("Records with temperature > 20°C").count(), 5);
}

#[test]
fn test_json_report_is_the_only_stdout() {
    let output = climate_load(&["--dry-run", "--no-otel", "--json-report"]);

    assert_eq!(output.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 15);
    assert!(outcomes.iter().all(|o| o["status"] == "succeeded"));

    // Log lines still appear, on stderr.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Dry run: using in-process store"));
}

#[test]
fn test_select_counts_printed_below_info() {
    let output = climate_load(&["--dry-run", "--no-otel", "--log-filter", "warn"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.matches("Records with temperature > 20°C").count(), 5);
}

#[test]
fn test_refused_connections_exit_one() {
    // Nothing listens on port 1, so every connect is refused.
    let output = climate_load(&["--no-otel", "--db-host", "127.0.0.1", "--db-port", "1"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Tasks: 0 succeeded, 15 failed"));
    assert_eq!(stdout.matches("✗").count(), 15);
}

#[test]
fn test_invalid_db_port_in_environment_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_climate-load"))
        .args(["--no-otel"])
        .env("DB_PORT", "mysql")
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid DB_PORT"));
}
