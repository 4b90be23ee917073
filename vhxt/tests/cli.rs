//! End-to-end tests running the vhxt binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn vhxt() -> Command {
    let mut cmd = Command::cargo_bin("vhxt").unwrap();
    cmd.env_remove("VHXT_CONFIG")
        .env_remove("VHXT_VERBOSE")
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

#[test]
fn test_modes_table() {
    vhxt()
        .args(["modes", "--type", "boolean", "--storage", "instance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("instance boolean (28/31 accesses)"))
        .stdout(predicate::str::contains("- getAndAdd "))
        .stdout(predicate::str::contains("+ getAndBitwiseXor "));
}

#[test]
fn test_modes_json() {
    let output = vhxt()
        .args(["modes", "--type", "int", "--storage", "static", "--final", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let desc = &parsed[0];
    assert_eq!(desc["storage"], "static");
    assert_eq!(desc["writable"], false);
    assert_eq!(desc["accesses"].as_array().unwrap().len(), 4);
}

#[test]
fn test_modes_unknown_type() {
    vhxt()
        .args(["modes", "--type", "Integer"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown type: Integer"));
}

#[test]
fn test_stress_small() {
    vhxt()
        .args(["stress", "--threads", "4", "--iterations", "200"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stress.weak"))
        .stdout(predicate::str::ends_with("ok\n"));
}

#[test]
fn test_leak_with_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vhxt.toml");
    std::fs::write(
        &path,
        "[runtime]\nreclaim_attempts = 200\nreclaim_interval_ms = 5\n\n[leak]\nrounds = 2\n",
    )
    .unwrap();

    vhxt()
        .arg("--config")
        .arg(&path)
        .arg("leak")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 loaders reclaimed"));
}

#[test]
fn test_bad_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vhxt.toml");
    std::fs::write(&path, "[runtime]\nsite_cache_capacity = 3\n").unwrap();

    vhxt()
        .arg("--config")
        .arg(&path)
        .arg("modes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid site cache capacity"));
}
