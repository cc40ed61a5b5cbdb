//! Integration tests for the command line interface.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use common::{write_boundaries, write_config, RANDOM_VALUES};

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("choromap").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_render_writes_image() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), RANDOM_VALUES);
    let output = dir.path().join("custom.png");

    let mut cmd = Command::cargo_bin("choromap").unwrap();
    cmd.arg("render")
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("16 regions"));

    assert!(output.exists());
}

#[test]
fn test_render_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("choromap").unwrap();
    cmd.arg("render")
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_inspect_lists_columns_and_values() {
    let dir = TempDir::new().unwrap();
    let boundaries = write_boundaries(dir.path());

    let mut cmd = Command::cargo_bin("choromap").unwrap();
    cmd.arg("inspect")
        .arg(&boundaries)
        .arg("--column")
        .arg("GF")
        .assert()
        .success()
        .stdout(predicate::str::contains("18 polygonal records"))
        .stdout(predicate::str::contains("AGS, GEN, GF"))
        .stdout(predicate::str::contains("4: 16"));
}

#[test]
fn test_inspect_unsupported_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("regions.kml");
    std::fs::write(&path, "<kml/>").unwrap();

    let mut cmd = Command::cargo_bin("choromap").unwrap();
    cmd.arg("inspect")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported boundary format"));
}
