//! CLI integration tests for smartdump.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for various error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the smartdump binary.
fn cmd() -> Command {
    Command::cargo_bin("smartdump").unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_connection_flags() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("--database"))
        .stdout(predicate::str::contains("--user"))
        .stdout(predicate::str::contains("--password"));
}

#[test]
fn test_help_shows_dump_flags() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-create-table"))
        .stdout(predicate::str::contains("--add-drop-table"))
        .stdout(predicate::str::contains("--include-schema"))
        .stdout(predicate::str::contains("--merge"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("smartdump"));
}

#[test]
fn test_verbosity_flag_default() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: warn]"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_no_tables_exits_with_config_error() {
    cmd()
        .args(["--user", "root", "--database", "shop"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No tables requested"));
}

#[test]
fn test_missing_user_exits_with_config_error() {
    cmd()
        .args(["--database", "shop", "orders"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No user specified"));
}

#[test]
fn test_missing_database_exits_with_config_error() {
    cmd()
        .args(["--user", "root", "orders"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No database specified"));
}

#[test]
fn test_invalid_verbosity_exits_with_config_error() {
    cmd()
        .args([
            "--user",
            "root",
            "--database",
            "shop",
            "--verbosity",
            "loud",
            "orders",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid verbosity"));
}

#[test]
fn test_multi_statement_conditions_rejected() {
    cmd()
        .args([
            "--user",
            "root",
            "--database",
            "shop",
            "orders:LIMIT 1; DROP TABLE x",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("single statement"));
}

#[test]
fn test_missing_config_file_exits_with_io_error() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "orders"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_invalid_yaml_config_exits_with_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "connection: [not: a: mapping").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "orders"])
        .assert()
        .code(2);
}
