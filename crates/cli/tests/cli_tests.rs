//! CLI integration tests

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Command for the built binary, isolated from the user's config and env
fn twin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_twin"));
    cmd.env("HOME", home)
        .env_remove("TWIN_API_URL")
        .env_remove("TWIN_DOCUMENT")
        .env_remove("TWIN_MODELS_DIR")
        .env_remove("RUST_LOG")
        .current_dir(home);
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    twin(home).args(args).output().expect("Failed to execute command")
}

fn stdout_json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line is not JSON"))
        .collect()
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Battery Twin"), "Should show app name");
    assert!(stdout.contains("simulate"), "Should show simulate command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("status"), "Should show status command");
    assert!(stdout.contains("remote"), "Should show remote command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("twin"), "Should show binary name");
}

#[test]
fn test_predict_without_models_prints_fallback() {
    let home = TempDir::new().unwrap();
    let output = run(
        home.path(),
        &[
            "predict",
            "--models-dir",
            "absent-models",
            r#"{"voltage": 3.7, "temperature": 25.0}"#,
        ],
    );

    assert!(output.status.success());
    let lines = stdout_json_lines(&output);
    assert_eq!(lines.len(), 1, "stdout must be exactly one JSON line");

    let prediction = &lines[0];
    assert_eq!(prediction["success"], false);
    assert_eq!(prediction["fallback"], true);
    assert_eq!(prediction["soh"], 90.0);
    let rul = prediction["rul"].as_f64().unwrap();
    assert!((1450.0..=1550.0).contains(&rul), "rul {rul}");
    assert!(prediction["error"].as_str().unwrap().contains("missing model artifacts"));
}

#[test]
fn test_predict_unparsable_input() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["predict", "--models-dir", "absent-models", "not json"]);

    assert!(output.status.success());
    let lines = stdout_json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["soh"], 85.0);
    assert_eq!(lines[0]["rul"], 1200.0);
    assert_eq!(lines[0]["success"], false);
}

#[test]
fn test_predict_warm_answers_each_line() {
    let home = TempDir::new().unwrap();
    let mut child = twin(home.path())
        .args(["predict", "--warm", "--models-dir", "absent-models"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, r#"{{"voltage": 3.7, "temperature": 25.0}}"#).unwrap();
        writeln!(stdin).unwrap();
        writeln!(stdin, r#"{{"voltage": 3.2, "temperature": 35.0}}"#).unwrap();
    }

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let lines = stdout_json_lines(&output);
    assert_eq!(lines.len(), 2, "blank lines are skipped");
    assert_eq!(lines[0]["soh"], 90.0);
    // 90 - 0.2 * 10 - 5 * 0.5
    assert_eq!(lines[1]["soh"], 85.5);
}

#[test]
fn test_status_without_document_shows_sample() {
    let home = TempDir::new().unwrap();
    let output = run(
        home.path(),
        &["status", "--format", "json", "--document", "missing.json"],
    );

    assert!(output.status.success());
    let session: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(session["name"], "Sample Live Trip");
    assert_eq!(session["readings"].as_array().unwrap().len(), 3);
    assert_eq!(session["current_phase"], "city");
}

#[test]
fn test_simulate_then_status() {
    let home = TempDir::new().unwrap();
    let document = home.path().join("live_trip_data.json");
    let document = document.to_str().unwrap();

    let output = run(
        home.path(),
        &[
            "simulate",
            "--readings",
            "3",
            "--interval-ms",
            "10",
            "--seed",
            "42",
            "--document",
            document,
        ],
    );
    assert!(output.status.success(), "simulate should exit at the reading limit");

    let output = run(home.path(), &["status", "-f", "json", "--document", document]);
    assert!(output.status.success());

    let session: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(session["name"], "Live Highway Trip");
    assert_eq!(session["total_readings"], 3);
    assert_eq!(session["readings"].as_array().unwrap().len(), 3);
}

#[test]
fn test_remote_help_lists_commands() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["remote", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("health"));
    assert!(stdout.contains("battery"));
    assert!(stdout.contains("trip"));
}

const BATTERY_BODY: &str = r#"{"battery_analysis":{
    "soh":{"percentage":87.5,"status":"good"},
    "rul":{"cycles":1310.0,"days":873.0,"months":29.1},
    "current_metrics":{"voltage":3.7,"current":2.0,"temperature":25.0,"soc":80.0,"estimated_range_km":280.0},
    "model_used":"gru","timestamp":"2024-01-01T00:00:00Z"}}"#;

const TRIP_BODY: &str = r#"{"trip_simulation":{
    "duration_minutes":10,"trip_type":"highway","data_points":2,
    "readings":[
        {"time_minutes":0,"voltage":3.6,"current":3.0,"temperature":28.0,"soc":90.0,"soh":88.0,"phase":"highway"},
        {"time_minutes":5,"voltage":3.62,"current":2.9,"temperature":28.5,"soc":75.0,"soh":88.1,"phase":"highway"}],
    "summary":{"initial_soc":90.0,"final_soc":75.0,"energy_consumed":15.0,"avg_temperature":28.3}}}"#;

#[test]
fn test_remote_battery_prints_analysis() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/predict/battery")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({"voltage": 3.7, "model": "gru"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(BATTERY_BODY)
        .create();

    let home = TempDir::new().unwrap();
    let output = run(
        home.path(),
        &[
            "remote",
            "battery",
            "--api-url",
            &server.url(),
            "-f",
            "json",
            r#"{"voltage": 3.7, "model": "gru"}"#,
        ],
    );

    mock.assert();
    assert!(output.status.success());
    let analysis: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(analysis["soh"]["percentage"], 87.5);
    assert_eq!(analysis["current_metrics"]["estimated_range_km"], 280.0);
}

#[test]
fn test_remote_battery_reports_server_error() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/predict/battery")
        .with_status(503)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"model `soh` is not available"}"#)
        .create();

    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["remote", "battery", "--api-url", &server.url()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("API error (503"), "{stderr}");
    assert!(stderr.contains("model `soh` is not available"), "{stderr}");
}

#[test]
fn test_remote_trip_sends_request_and_prints_table() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/simulate/trip")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "duration_minutes": 10.0,
            "type": "highway",
            "initial_soc": 90.0
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TRIP_BODY)
        .create();

    let home = TempDir::new().unwrap();
    let output = run(
        home.path(),
        &[
            "remote",
            "trip",
            "--api-url",
            &server.url(),
            "--duration",
            "10",
            "--type",
            "highway",
            "--initial-soc",
            "90",
        ],
    );

    mock.assert();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("highway trip, 10 minutes"), "{stdout}");
    assert!(stdout.contains("Average temperature: 28.3"), "{stdout}");
}

#[test]
fn test_remote_trip_reports_server_error() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/simulate/trip")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"inference failed for `soh`: non-finite output"}"#)
        .create();

    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["remote", "trip", "--api-url", &server.url()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("API error (500"), "{stderr}");
    assert!(stderr.contains("non-finite output"), "{stderr}");
}

#[test]
fn test_remote_health_lists_artifact_fingerprints() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"status":"healthy","timestamp":"2024-01-01T00:00:00Z","models_loaded":4,
                "available_models":["soh","rul_gru","rul_gru_norm","rul_lstm"],
                "artifacts":[{"name":"soh","file":"soh_rf_model.onnx","sha256":"9f86d081884c7d65"}],
                "components":{}}"#,
        )
        .create();

    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["remote", "health", "--api-url", &server.url()]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("soh_rf_model.onnx"), "{stdout}");
    assert!(stdout.contains("9f86d081884c7d65"), "{stdout}");
}
