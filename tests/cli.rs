use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn gateway() -> Command {
    let mut cmd = Command::cargo_bin("sms-gateway").unwrap();
    for var in [
        "SMS_GATEWAY_LOG_LEVEL",
        "SMS_GATEWAY_LOG_FORMAT",
        "SMS_GATEWAY_PORT",
        "SMS_GATEWAY_ADMIN_PASSWORD",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_cli_version() {
    gateway()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "sms-gateway {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_help() {
    gateway()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Quota-enforcing SMS submission gateway",
        ));
}

#[test]
fn test_cli_check_config_redacts_password() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[admin]\nusername = \"ops\"\npassword = \"hunter2\"\n\n[quota]\ndefault_limit = 10\n",
    )
    .unwrap();

    gateway()
        .arg("--config")
        .arg(&path)
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("username = \"ops\""))
        .stdout(predicate::str::contains("default_limit = 10"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_cli_check_config_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();

    gateway()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("default_limit = 200000"));
}

#[test]
fn test_cli_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[server]\nport = 0\n").unwrap();

    gateway()
        .arg("--config")
        .arg(&path)
        .arg("check-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server port must be > 0"));
}

#[test]
fn test_cli_serve_rejects_unknown_flag() {
    gateway()
        .args(["serve", "--bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}
