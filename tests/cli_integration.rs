//! CLI integration tests
//!
//! Runs the `blink` binary and checks its argument handling and failure modes.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn isolated(cmd: &mut assert_cmd::Command) {
    for var in [
        "BLINK_CONFIG",
        "BLINK_EMAIL",
        "BLINK_PASSWORD",
        "BLINK_REFRESH_TOKEN",
        "BLINK_AUTH_MODE",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
}

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("blink");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    let mut cmd = cargo_bin_cmd!("blink");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("refresh-token"));
}

#[test]
fn test_download_help_lists_options() {
    let mut cmd = cargo_bin_cmd!("blink");
    cmd.args(["download", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--out"))
        .stdout(predicate::str::contains("--tries"));
}

#[test]
fn test_missing_subcommand_fails() {
    let mut cmd = cargo_bin_cmd!("blink");
    cmd.assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_no_account_configured() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "[logging]\nlevel = \"error\"").unwrap();

    let mut cmd = cargo_bin_cmd!("blink");
    isolated(&mut cmd);
    cmd.args(["dashboard", "--config"]).arg(config.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no account configured"));
}

#[test]
fn test_invalid_config_reported() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "[video]\nclip_try_count = 0").unwrap();

    let mut cmd = cargo_bin_cmd!("blink");
    isolated(&mut cmd);
    cmd.args(["videos", "--config"]).arg(config.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("clip_try_count"));
}
