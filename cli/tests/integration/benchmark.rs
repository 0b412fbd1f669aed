//! `--benchmark`, `--ask` and `--auto` integration tests.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{TestFixture, list_files};
use predicates::prelude::*;

#[test]
fn test_benchmark_prints_recommendation_and_exits() {
    let fx = TestFixture::new();
    fx.create_files(3, 4096);

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--benchmark")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Benchmark results:"))
        .stdout(predicate::str::contains("Storage tier:"))
        .stdout(predicate::str::contains("Recommended flags: --threads"))
        .stdout(predicate::str::contains("Completed:").not());

    // The destination root may exist, but no file was transferred or left over
    assert!(list_files(&fx.dst).is_empty());
}

#[test]
fn test_benchmark_ask_without_terminal_does_not_transfer() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--benchmark")
        .arg("--ask")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stderr(predicate::str::contains("not starting the transfer"));

    assert!(list_files(&fx.dst).is_empty());
}

#[test]
fn test_auto_runs_with_post_verification() {
    let fx = TestFixture::new();
    fx.create_files(4, 2048);

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--auto")
        .arg("--threads")
        .arg("64")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Benchmark results:"))
        .stdout(predicate::str::contains("Verification:   post_verify"))
        .stdout(predicate::str::contains("Threads:        64").not())
        .stdout(predicate::str::contains("Completed:      4"));

    assert_eq!(list_files(&fx.dst).len(), 4);
}

#[test]
fn test_benchmark_on_empty_source() {
    let fx = TestFixture::new();

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--benchmark")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Source read:"));
}
