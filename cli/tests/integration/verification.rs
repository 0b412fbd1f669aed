//! Verification modes and failure reporting.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{TestFixture, has_temp_artifacts};
use predicates::prelude::*;
use rstest::rstest;

#[rstest]
#[case::none(&[], "none")]
#[case::inline(&["--verify"], "inline")]
#[case::post_verify(&["--verify-after"], "post_verify")]
fn test_verification_modes_copy_intact(#[case] flags: &[&str], #[case] shown: &str) {
    let fx = TestFixture::new();
    fx.write_src("one.bin", &"1".repeat(70_000));
    fx.write_src("dir/two.bin", &"2".repeat(10));

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.args(flags)
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Verification:   {shown}")))
        .stdout(predicate::str::contains("Completed:      2"));

    assert_eq!(fx.read_dst("one.bin"), "1".repeat(70_000));
    assert_eq!(fx.read_dst("dir/two.bin"), "2".repeat(10));
}

/// A directory sitting where a file should land makes the commit fail.
#[test]
fn test_failed_file_reports_untrusted_data() {
    let fx = TestFixture::new();
    fx.write_src("good.txt", "fine");
    fx.write_src("blocked", "cannot land");
    fx.write_dst("blocked/keep.txt", "existing");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--verify-after")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Failed:         1"))
        .stdout(predicate::str::contains("Completed:      1"))
        .stderr(predicate::str::contains("must not be trusted"));

    assert_eq!(fx.read_dst("good.txt"), "fine");
    assert_eq!(fx.read_dst("blocked/keep.txt"), "existing");
    assert!(!has_temp_artifacts(&fx.dst));
}

#[test]
fn test_failed_move_keeps_source() {
    let fx = TestFixture::new();
    fx.write_src("blocked", "precious");
    fx.write_dst("blocked/keep.txt", "existing");

    let mut cmd = cargo_bin_cmd!("ccopy");
    cmd.arg("--move")
        .arg(&fx.src)
        .arg(&fx.dst)
        .assert()
        .code(1);

    assert!(fx.src.join("blocked").exists());
}
