//! `--dry-run` integration tests.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{TestFixture, list_files};
use predicates::prelude::*;

#[test]
fn test_dry_run_creates_nothing() {
    let fx = TestFixture::new();
    fx.create_files(3, 1024);

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--dry-run")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("Files:          3"))
        .stdout(predicate::str::contains("Total size:     3.00 KB"))
        .stdout(predicate::str::contains("Sample:         3072 bytes"))
        .stdout(predicate::str::contains("Intent:         FAST"));

    assert!(!fx.dst.exists());
}

#[test]
fn test_dry_run_counts_skips() {
    let fx = TestFixture::new();
    fx.write_src("same.txt", "same");
    fx.write_dst("same.txt", "same");
    fx.sync_mtime("same.txt");
    fx.write_src("other.txt", "new");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--dry-run")
        .arg("--update")
        .arg("--verify")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("To transfer:    1"))
        .stdout(predicate::str::contains("To skip:        1"))
        .stdout(predicate::str::contains("Intent:         SAFE"));

    assert_eq!(list_files(&fx.dst), ["same.txt"]);
}

#[test]
fn test_dry_run_move_keeps_sources() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--dry-run")
        .arg("--move")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Intent:         SAFE"));

    assert!(fx.src.join("a.txt").exists());
    assert!(!fx.dst.exists());
}

#[test]
fn test_dry_run_ignores_auto() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--dry-run")
        .arg("--auto")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Benchmarking").not());

    assert!(!fx.dst.exists());
}
