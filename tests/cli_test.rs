// ABOUTME: Integration tests for the boundquery-cli binary
// ABOUTME: Runs the compiled CLI as a subprocess and checks stdout and exit status
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::fs;
use std::process::Command;

use boundquery::constants::env_keys;

const CLI: &str = env!("CARGO_BIN_EXE_boundquery-cli");

fn cli() -> Command {
    let mut command = Command::new(CLI);
    command
        .env_remove(env_keys::DATABASE_URL)
        .env_remove(env_keys::CATALOG_PATH)
        .env("RUST_LOG", "error");
    command
}

#[test]
fn test_catalog_listing_needs_no_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    fs::write(
        &path,
        r#"{"sales_over": "SELECT Amount FROM Sales WHERE Amount > :min:integer"}"#,
    )
    .unwrap();

    let output = cli().arg("--catalog").arg(&path).arg("catalog").output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("sales_over"));
    assert!(stdout.contains(":min:integer"));
}

#[test]
fn test_catalog_path_is_read_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    fs::write(&path, r#"{"all_sales": "SELECT * FROM Sales"}"#).unwrap();

    let output = cli()
        .env(env_keys::CATALOG_PATH, &path)
        .arg("catalog")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().contains("all_sales"));
}

#[test]
fn test_query_without_database_url_reports_config_missing() {
    let output = cli().args(["query", "--sql", "SELECT 1"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("CONFIG_MISSING"));
}
