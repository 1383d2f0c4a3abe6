//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

fn hearth() -> Command {
    let mut cmd = Command::cargo_bin("hearth").unwrap();
    // Unreachable on purpose: nothing here may need a live database
    cmd.env("DATABASE_URL", "postgres://hearth@127.0.0.1:1/hearth");
    cmd
}

#[test]
fn test_top_level_help() {
    hearth()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("property"))
        .stdout(predicate::str::contains("review"));
}

// === Property Command Tests ===

#[test]
fn test_property_list_help() {
    hearth()
        .args(["property", "list", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--min-price"))
        .stdout(predicate::str::contains("Case-insensitive substring"));
}

#[test]
fn test_property_show_requires_id() {
    hearth()
        .args(["property", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<ID>"));
}

#[test]
fn test_property_list_rejects_non_numeric_filter() {
    hearth()
        .args(["property", "list", "--min-price", "cheap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid filter"))
        .stderr(predicate::str::contains("minPrice"));
}

// === Review Command Tests ===

#[test]
fn test_review_verify_help() {
    hearth()
        .args(["review", "verify", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--pending"));
}

#[test]
fn test_review_list_help() {
    hearth()
        .args(["review", "list", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Max reviews"));
}

#[test]
fn test_review_delete_rejects_bad_id() {
    hearth()
        .args(["review", "delete", "not-a-uuid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// === Unreachable Database Tests ===

fn hearth_offline() -> Command {
    let mut cmd = hearth();
    cmd.env("DB_ACQUIRE_ATTEMPTS", "1")
        .env("DB_CONNECT_TIMEOUT_SECS", "2")
        .env("DB_BACKOFF_BASE_MS", "10")
        .env("DB_BACKOFF_CAP_MS", "10");
    cmd
}

#[test]
fn test_review_list_json_degrades_when_offline() {
    hearth_offline()
        .args(["review", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 0"))
        .stdout(predicate::str::contains("temporarily unavailable"));
}

#[test]
fn test_review_stats_fails_when_offline() {
    hearth_offline()
        .args(["review", "stats", "-o", "json"])
        .assert()
        .failure();
}
