//! End-to-end integration tests for the complete accounting flow.
//!
//! Tests the full pipeline: ingest → charge → discount → charge.

use std::process::Command;

use tempfile::TempDir;

fn ta_binary() -> String {
    env!("CARGO_BIN_EXE_ta").to_string()
}

fn ta(temp: &TempDir, args: &[&str]) -> std::process::Output {
    Command::new(ta_binary())
        .env("TA_DATABASE_PATH", temp.path().join("ta.db"))
        .args(args)
        .output()
        .expect("failed to run ta")
}

fn ta_ok(temp: &TempDir, args: &[&str]) -> String {
    let output = ta(temp, args);
    assert!(
        output.status.success(),
        "ta {args:?} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

fn ingest(temp: &TempDir, time: &str, class: &str, step: Option<(&str, &str)>) {
    let mut args = vec![
        "ingest", "--visit", "v-1", "--class", class, "--time", time,
    ];
    if let Some((atom, step)) = step {
        args.extend(["--atom", atom, "--step", step]);
    }
    ta_ok(temp, &args);
}

#[test]
fn test_ingest_charge_discount_flow() {
    let temp = TempDir::new().unwrap();

    // Slew, observe one step, then idle.
    ingest(&temp, "1970-01-01T00:00:00Z", "program", None);
    ingest(
        &temp,
        "1970-01-01T00:00:10Z",
        "program",
        Some(("a-1", "s-1")),
    );
    ingest(&temp, "1970-01-01T00:00:30Z", "non_charged", None);

    // Program time runs from the first event to the class switch.
    let stdout = ta_ok(
        &temp,
        &[
            "charge",
            "--visit",
            "v-1",
            "--until",
            "1970-01-01T00:01:00Z",
            "--json",
        ],
    );
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["charge"]["categorized"]["program"], 30_000_000);
    assert_eq!(report["charge"]["categorized"]["non_charged"], 30_000_000);

    // Discount the step's atom; its full 20s of program time goes.
    let stdout = ta_ok(
        &temp,
        &[
            "discount",
            "--visit",
            "v-1",
            "atoms",
            "--start",
            "1970-01-01T00:00:15Z",
            "--end",
            "1970-01-01T00:00:16Z",
            "--comment",
            "guider fault",
        ],
    );
    assert!(stdout.contains("removes 20s"), "stdout: {stdout}");

    let stdout = ta_ok(
        &temp,
        &[
            "charge",
            "--visit",
            "v-1",
            "--until",
            "1970-01-01T00:01:00Z",
            "--json",
        ],
    );
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["charge"]["categorized"]["program"], 10_000_000);
    assert_eq!(report["discounts"][0]["kind"], "atoms");
}

#[test]
fn test_events_outputs_jsonl() {
    let temp = TempDir::new().unwrap();
    ingest(&temp, "1970-01-01T00:00:00Z", "program", None);
    ingest(&temp, "1970-01-01T00:00:10Z", "partner", None);

    let stdout = ta_ok(&temp, &["events", "--visit", "v-1"]);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(event["visit_id"], "v-1");
    }
}

#[test]
fn test_status_lists_visits() {
    let temp = TempDir::new().unwrap();
    ingest(&temp, "1970-01-01T00:00:00Z", "program", None);

    let stdout = ta_ok(&temp, &["status"]);
    assert!(stdout.contains("v-1"), "stdout: {stdout}");
    assert!(stdout.contains("1 events"), "stdout: {stdout}");
}

#[test]
fn test_ingest_rejects_step_without_atom() {
    let temp = TempDir::new().unwrap();
    let output = ta(
        &temp,
        &[
            "ingest", "--visit", "v-1", "--class", "program", "--step", "s-1",
        ],
    );
    assert!(!output.status.success());
}
