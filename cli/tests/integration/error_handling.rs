//! Error handling integration tests for the ccopy CLI.
//!
//! Precondition failures must stop the run before any file is touched.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::TestFixture;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_missing_source_fails() {
    let fx = TestFixture::new();

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(fx.root.path().join("nope"))
        .arg(&fx.dst)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Source does not exist"));

    assert!(!fx.dst.exists());
}

#[test]
fn test_source_file_is_rejected() {
    let fx = TestFixture::new();
    let file = fx.write_src("single.txt", "data");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(&file)
        .arg(&fx.dst)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("must be a directory"));
}

#[test]
fn test_destination_inside_source_fails() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(&fx.src)
        .arg(fx.src.join("backup"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("inside source"));

    assert!(!fx.src.join("backup").exists());
}

#[test]
fn test_destination_equal_to_source_fails() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(&fx.src)
        .arg(&fx.src)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("inside source"));
}

#[test]
fn test_ask_requires_benchmark() {
    let fx = TestFixture::new();

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--ask")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--benchmark"));

    assert!(!fx.dst.exists());
}

#[test]
fn test_missing_destination_argument() {
    let fx = TestFixture::new();

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(&fx.src).assert().failure();
}

#[test]
fn test_unwritable_log_path_fails_before_copy() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");
    let log_dir = fx.root.path().join("logdir");
    fs::create_dir(&log_dir).unwrap();

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(format!("--log={}", log_dir.display()))
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to open log file"));

    assert!(!fx.dst.exists());
}

#[test]
fn test_temp_named_source_is_skipped() {
    let fx = TestFixture::new();
    fx.write_src("real.txt", "data");
    fx.write_src("stale.abc.ccopy_tmp", "leftover");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed:      1"));

    assert!(fx.dst.join("real.txt").exists());
    assert!(!fx.dst.join("stale.abc.ccopy_tmp").exists());
}

#[test]
fn test_verify_and_verify_after_conflict() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--verify")
        .arg("--verify-after")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));

    assert!(!fx.dst.exists());
}
