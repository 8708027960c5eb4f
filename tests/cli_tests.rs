//! CLI integration tests using assert_cmd.
//!
//! Tests without database: always run (help, arg validation, field tables).
//! Tests with database: gated on TEST_DATABASE_URL environment variable.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn fleetledger() -> Command {
    let mut cmd = Command::cargo_bin("fleetledger").unwrap();
    cmd.env_remove("DATABASE_URL")
        .env_remove("FLEETLEDGER_CONFIG")
        .env_remove("FLEETLEDGER_ACTOR");
    cmd
}

// --- Help and arg validation (no database needed) ---

#[test]
fn help_shows_all_subcommands() {
    fleetledger().arg("--help").assert().success().stdout(
        predicate::str::contains("serve")
            .and(predicate::str::contains("migrate"))
            .and(predicate::str::contains("get"))
            .and(predicate::str::contains("list"))
            .and(predicate::str::contains("create"))
            .and(predicate::str::contains("update"))
            .and(predicate::str::contains("delete"))
            .and(predicate::str::contains("history"))
            .and(predicate::str::contains("verify"))
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("fields")),
    );
}

#[test]
fn help_update_shows_set() {
    fleetledger()
        .args(["update", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--set").and(predicate::str::contains("FIELD=VALUE")));
}

#[test]
fn fields_prints_tracked_columns() {
    fleetledger()
        .args(["fields", "mixers"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("truck_number")
                .and(predicate::str::contains("last_chip_date"))
                .and(predicate::str::contains("untracked"))
                .and(predicate::str::contains("90 days")),
        );
}

#[test]
fn fields_accepts_kind_aliases() {
    fleetledger()
        .args(["fields", "pickup_trucks"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mileage").and(predicate::str::contains("30 days")));
}

#[test]
fn fields_reports_configured_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleetledger.toml");
    std::fs::write(&path, "[service]\nmixer_days = 45\n").unwrap();
    fleetledger()
        .arg("--config")
        .arg(&path)
        .args(["fields", "mixers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("45 days").and(predicate::str::contains("90 days").not()));
}

#[test]
fn unknown_kind_fails() {
    fleetledger()
        .args(["fields", "tractors"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown entity kind"));
}

#[test]
fn update_requires_set() {
    fleetledger()
        .args(["update", "mixers", "00000000-0000-0000-0000-000000000001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--set"));
}

#[test]
fn entity_command_requires_database_url() {
    fleetledger()
        .args(["get", "mixers", "00000000-0000-0000-0000-000000000001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL is required"));
}

#[test]
fn invalid_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleetledger.toml");
    std::fs::write(&path, "[server]\nport = 0\n").unwrap();
    fleetledger()
        .arg("--config")
        .arg(&path)
        .args(["get", "mixers", "00000000-0000-0000-0000-000000000001"])
        .assert()
        .failure();
}

// --- Database-backed commands ---

#[test]
fn migrate_then_list_is_empty() {
    if !common::has_test_db() {
        eprintln!("Skipping: TEST_DATABASE_URL not set");
        return;
    }
    let url = common::test_db_url();
    fleetledger()
        .env("DATABASE_URL", &url)
        .arg("migrate")
        .assert()
        .success();
    fleetledger()
        .env("DATABASE_URL", &url)
        .args(["list", "equipment"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["));
}
