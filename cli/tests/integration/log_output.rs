//! JSONL session log (`--log`) integration tests.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::TestFixture;
use serde_json::Value;
use std::fs;
use std::path::Path;

const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

fn read_records(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn of_type<'a>(records: &'a [Value], record_type: &str) -> Vec<&'a Value> {
    records
        .iter()
        .filter(|r| r["record_type"] == record_type)
        .collect()
}

#[test]
fn test_log_records_tasks_and_summary() {
    let fx = TestFixture::new();
    fx.write_src("hello.txt", "hello");
    fx.write_src("sub/other.txt", "other");
    let log = fx.log_path();

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(format!("--log={}", log.display()))
        .arg("--verify")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success();

    let records = read_records(&log);
    assert!(records.iter().all(|r| r["schema_version"] == "1.0"));
    assert!(records.iter().all(|r| r["ts"].is_f64()));

    let start = of_type(&records, "session_start");
    assert_eq!(start.len(), 1);
    assert_eq!(start[0]["config"]["verification"], "inline");

    let tasks = of_type(&records, "task");
    assert_eq!(tasks.len(), 2);
    let hello = tasks
        .iter()
        .find(|t| t["path"] == "hello.txt")
        .expect("hello.txt record");
    assert_eq!(hello["status"], "completed");
    assert_eq!(hello["bytes"], 5);
    assert_eq!(hello["digest"], HELLO_SHA256);
    assert!(hello["error"].is_null());

    let summary = of_type(&records, "summary");
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0]["completed"], 2);
    assert_eq!(summary[0]["failed"], 0);
    assert_eq!(summary[0]["exit_code"], 0);
    assert_eq!(records.last().unwrap()["record_type"], "summary");

    assert!(of_type(&records, "plan_item").is_empty());
}

#[test]
fn test_log_debug_level_includes_plan() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");
    fx.write_src("b.txt", "beta");
    fx.write_dst("b.txt", "beta");
    fx.sync_mtime("b.txt");
    let log = fx.log_path();

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(format!("--log={}", log.display()))
        .arg("--log-level")
        .arg("debug")
        .arg("--update")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success();

    let records = read_records(&log);
    let plan = of_type(&records, "plan_item");
    assert_eq!(plan.len(), 2);
    assert!(
        plan.iter()
            .any(|p| p["action"] == "skip" && p["source"].as_str().unwrap().ends_with("b.txt"))
    );
    assert!(plan.iter().any(|p| p["action"] == "transfer"));

    let tasks = of_type(&records, "task");
    assert!(tasks.iter().any(|t| t["status"] == "skipped"));
}

#[test]
fn test_log_appends_across_runs() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");
    let log = fx.log_path();

    for _ in 0..2 {
        let mut cmd = cargo_bin_cmd!("ccopy");
        cmd.arg(format!("--log={}", log.display()))
            .arg("--update")
            .arg(&fx.src)
            .arg(&fx.dst)
            .assert()
            .success();
    }

    let records = read_records(&log);
    assert_eq!(of_type(&records, "session_start").len(), 2);
    assert_eq!(of_type(&records, "summary").len(), 2);
}

#[test]
fn test_log_failed_task_has_error() {
    let fx = TestFixture::new();
    fx.write_src("blocked", "data");
    fx.write_dst("blocked/inner.txt", "existing");
    let log = fx.log_path();

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(format!("--log={}", log.display()))
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .code(1);

    let records = read_records(&log);
    let tasks = of_type(&records, "task");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["status"], "failed");
    assert!(tasks[0]["error"].is_string());
    assert_eq!(of_type(&records, "summary")[0]["exit_code"], 1);
}

#[test]
fn test_dry_run_log_marks_predictions() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");
    let log = fx.log_path();

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(format!("--log={}", log.display()))
        .arg("--dry-run")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success();

    let records = read_records(&log);
    let tasks = of_type(&records, "task");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["dry_run"], true);
    assert_eq!(of_type(&records, "summary")[0]["dry_run"], true);
}
