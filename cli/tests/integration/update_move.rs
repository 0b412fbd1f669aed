//! Incremental (`--update`) and move (`--move`) integration tests.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{TestFixture, has_temp_artifacts, list_files};
use predicates::prelude::*;
use std::fs;

/// One file already mirrored, one changed, one new.
#[test]
fn test_update_verify_after_two_threads() {
    let fx = TestFixture::new();
    fx.write_src("same.txt", "unchanged");
    fx.write_src("changed.txt", "new version");
    fx.write_src("new/fresh.txt", "brand new");

    fx.write_dst("same.txt", "unchanged");
    fx.sync_mtime("same.txt");
    fx.write_dst("changed.txt", "old");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--update")
        .arg("--verify-after")
        .arg("--threads")
        .arg("2")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Completed:      2"))
        .stdout(predicate::str::contains("Skipped:        1"))
        .stdout(predicate::str::contains("Failed:         0"))
        .stdout(predicate::str::contains("Verification:   post_verify"));

    assert_eq!(fx.read_dst("same.txt"), "unchanged");
    assert_eq!(fx.read_dst("changed.txt"), "new version");
    assert_eq!(fx.read_dst("new/fresh.txt"), "brand new");
    assert!(!has_temp_artifacts(&fx.dst));
}

#[test]
fn test_second_update_run_skips_everything() {
    let fx = TestFixture::new();
    fx.create_files(5, 100);

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(&fx.src).arg(&fx.dst).assert().success();

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--update")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped:        5"))
        .stdout(predicate::str::contains("Completed:      0"));
}

#[test]
fn test_move_removes_sources_after_verification() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");
    fx.write_src("deep/b.txt", "beta");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--move")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Mode:           MOVE"))
        .stdout(predicate::str::contains("Verification:   post_verify"))
        .stderr(predicate::str::contains("enabling post-copy verification"));

    assert_eq!(list_files(&fx.dst), ["a.txt", "deep/b.txt"]);
    assert!(list_files(&fx.src).is_empty());
}

#[test]
fn test_move_with_inline_verification_keeps_mode() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--move")
        .arg("--verify")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Verification:   inline"));

    assert!(!fx.src.join("a.txt").exists());
    assert_eq!(fx.read_dst("a.txt"), "alpha");
}

#[test]
fn test_move_update_keeps_skipped_sources() {
    let fx = TestFixture::new();
    fx.write_src("kept.txt", "same");
    fx.write_dst("kept.txt", "same");
    fx.sync_mtime("kept.txt");
    fx.write_src("moved.txt", "go");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--move")
        .arg("--update")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success();

    assert!(fx.src.join("kept.txt").exists());
    assert!(!fx.src.join("moved.txt").exists());
    assert_eq!(fs::read_to_string(fx.dst.join("moved.txt")).unwrap(), "go");
}
