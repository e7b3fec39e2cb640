//! Integration tests for the scoutdoc CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const IAM_REPORT: &str = r#"scoutsuite_results =
{"services": {"iam": {
  "findings": {"iam-user-no-Active-key-rotation": {
    "items": ["iam.users.U1.AccessKeys.0", "iam.users.U2.AccessKeys.0"]
  }},
  "users": {
    "U1": {"AccessKeys": [{"AccessKeyId": "AKIA1", "UserName": "alice"}]},
    "U2": {"AccessKeys": [{"AccessKeyId": "AKIA2", "UserName": "bob"}]}
  }
}}}"#;

fn scoutdoc(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("scoutdoc").unwrap();
    cmd.current_dir(dir.path());
    cmd
}

/// Test CLI binary exists and responds to --help
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("scoutdoc").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ScoutSuite"))
        .stdout(predicate::str::contains("run"));
}

/// Test CLI responds to --version
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("scoutdoc").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("scoutdoc"));
}

/// Test invalid subcommand shows error
#[test]
fn test_invalid_subcommand() {
    let mut cmd = Command::cargo_bin("scoutdoc").unwrap();
    cmd.arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_modules_listing() {
    let mut cmd = Command::cargo_bin("scoutdoc").unwrap();
    cmd.args(["modules", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("access-key-age"))
        .stdout(predicate::str::contains("open-buckets"));
}

#[test]
fn test_headless_run_reports_affected_assets() {
    let dir = TempDir::new().unwrap();
    let reports = dir.path().join("scout");
    fs::create_dir_all(reports.join("acct-1")).unwrap();
    fs::write(reports.join("acct-1/scoutsuite_results_aws-1.js"), IAM_REPORT).unwrap();

    let assert = scoutdoc(&dir)
        .args(["run", "--module", "access-key-age", "--format", "json", "--reports"])
        .arg(&reports)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let modules = report["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0]["name"], "Access Key Age/Last Used");
    assert_eq!(modules[0]["complete"], true);
    assert_eq!(modules[0]["affected_assets"][0]["id"], "AKIA1");
    assert_eq!(modules[0]["affected_assets"][1]["name"], "bob");
    assert_eq!(report["progress"]["done"], 2);
    assert_eq!(report["progress"]["total"], 2);
}

#[test]
fn test_headless_run_text_output() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("scoutsuite_results_aws-1.js"), IAM_REPORT).unwrap();

    scoutdoc(&dir)
        .args(["run", "-m", "access-key-age", "--reports", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 affected assets"))
        .stdout(predicate::str::contains("AKIA2"));
}

#[test]
fn test_headless_run_rejects_unknown_module() {
    let dir = TempDir::new().unwrap();
    scoutdoc(&dir)
        .args(["run", "--module", "no-such-check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown module 'no-such-check'"));
}

/// Test configuration functionality
#[test]
fn test_config_operations() {
    let dir = TempDir::new().unwrap();

    scoutdoc(&dir)
        .args(["config", "init"])
        .assert()
        .success();
    let written = fs::read_to_string(dir.path().join("config.json")).unwrap();
    assert!(written.contains("  \"pwndoc_url\": \"https://localhost:8443\""));

    // A second init refuses to overwrite
    scoutdoc(&dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    scoutdoc(&dir)
        .args(["config", "validate"])
        .assert()
        .success();

    scoutdoc(&dir)
        .args(["config", "validate"])
        .env("SCOUTDOC_PWNDOC_URL", "not a url")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Pwndoc URL"));
}

#[test]
fn test_config_show_masks_secrets() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.json"),
        r#"{"pwndoc_username": "admin", "pwndoc_password": "hunter2"}"#,
    )
    .unwrap();

    scoutdoc(&dir)
        .args(["config", "show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pwndoc_username\": \"admin\""))
        .stdout(predicate::str::contains("\"pwndoc_password\": \"*******\""))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_config_show_reads_legacy_key_names() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.json"),
        r#"{"PwndocUrl": "https://10.0.0.5:8443", "OutputDir": "/tmp/out"}"#,
    )
    .unwrap();

    scoutdoc(&dir)
        .args(["config", "show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pwndoc_url\": \"https://10.0.0.5:8443\""))
        .stdout(predicate::str::contains("\"output_dir\": \"/tmp/out\""));

    scoutdoc(&dir)
        .args(["config", "show", "--format", "json"])
        .env("SCOUTDOC_OUTPUT_DIR", "/srv/out")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"output_dir\": \"/srv/out\""))
        .stdout(predicate::str::contains("\"pwndoc_url\": \"https://10.0.0.5:8443\""));
}
