//! Basic functionality integration tests for the ccopy CLI.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{TestFixture, has_temp_artifacts, list_files};
use predicates::prelude::*;
use rstest::rstest;

#[test]
fn test_copy_tree() {
    let fx = TestFixture::new();
    fx.write_src("file1.txt", "content1");
    fx.write_src("subdir/file2.txt", "content2");
    fx.write_src("subdir/nested/file3.txt", "content3");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed:      3"))
        .stdout(predicate::str::contains("Mode:           COPY"));

    assert_eq!(
        list_files(&fx.dst),
        ["file1.txt", "subdir/file2.txt", "subdir/nested/file3.txt"]
    );
    assert_eq!(fx.read_dst("subdir/nested/file3.txt"), "content3");
    assert!(fx.src.join("file1.txt").exists());
    assert!(!has_temp_artifacts(&fx.dst));
}

#[rstest]
#[case(1, 1)]
#[case(4, 1)]
#[case(8, 2)]
fn test_copy_with_threads_and_buffer(#[case] threads: usize, #[case] buffer: usize) {
    let fx = TestFixture::new();
    fx.create_files(20, 3000);

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--threads")
        .arg(threads.to_string())
        .arg("--buffer")
        .arg(buffer.to_string())
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Threads:        {threads}")));

    assert_eq!(list_files(&fx.dst).len(), 20);
    assert_eq!(fx.read_dst("file7.txt"), "x".repeat(3000));
}

#[test]
fn test_empty_source_succeeds() {
    let fx = TestFixture::new();

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed:      0"));

    assert!(fx.dst.is_dir());
}

#[test]
fn test_copy_overwrites_changed_destination() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "new content");
    fx.write_dst("a.txt", "old");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg(&fx.src).arg(&fx.dst).assert().success();

    assert_eq!(fx.read_dst("a.txt"), "new content");
}

#[test]
fn test_version() {
    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ccopy"));
}

#[test]
fn test_help_lists_flags() {
    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verify-after"))
        .stdout(predicate::str::contains("--benchmark"))
        .stdout(predicate::str::contains("--dry-run"));
}
