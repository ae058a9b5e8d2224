//! Black-box CLI tests exercising the `scheduler` binary end to end against
//! a temporary SQLite database, grounded on the teacher's
//! `cli_integration_tests.rs` harness pattern.

use predicates::prelude::*;

mod helpers;
use helpers::{assertions, CliTestHarness};

#[test]
fn test_cli_help_and_version() {
    let harness = CliTestHarness::new();
    harness.run_success(&["--help"]).stdout(predicate::str::contains("scheduler"));
    harness.run_success(&["--version"]);
    harness.run_failure(&["not-a-command"]);
}

#[test]
fn test_series_lifecycle() {
    let harness = CliTestHarness::new();

    harness
        .run_success(&[
            "series", "add", "Heater",
            "--endpoint", "opc.tcp://plc",
            "--node-id", "ns=2;s=Heater",
            "--value", "1",
            "--rrule", "FREQ=DAILY;BYHOUR=9;BYMINUTE=0;DTSTART:20260216T090000;DURATION=PT1H",
        ])
        .stdout(assertions::created_successfully());

    harness.run_success(&["series", "list"]).stdout(predicate::str::contains("Heater"));
    harness.run_success(&["series", "show", "1"]).stdout(predicate::str::contains("Heater"));

    harness
        .run_success(&["series", "edit", "1", "--priority", "5"])
        .stdout(predicate::str::contains("Updated"));

    harness.run_success(&["series", "delete", "1"]).stdout(predicate::str::contains("Deleted"));
}

#[test]
fn test_series_add_rejects_invalid_rrule() {
    let harness = CliTestHarness::new();
    harness
        .run_failure(&[
            "series", "add", "Bad",
            "--endpoint", "opc.tcp://plc",
            "--node-id", "ns=2;s=Bad",
            "--value", "1",
            "--rrule", "FREQ=FORTNIGHTLY",
        ])
        .stderr(assertions::has_error());
}

#[test]
fn test_category_list_includes_system_seed() {
    let harness = CliTestHarness::new();
    harness.run_success(&["category", "list"]).stdout(predicate::str::contains("Red"));
}

#[test]
fn test_override_set_clear_roundtrip() {
    let harness = CliTestHarness::new();
    harness
        .run_success(&["override", "set", "0"])
        .stdout(predicate::str::contains("Runtime override set"));
    harness.run_success(&["override", "show"]).stdout(predicate::str::contains("0"));
    harness.run_success(&["override", "clear"]).stdout(predicate::str::contains("cleared"));
    harness.run_success(&["override", "show"]).stdout(predicate::str::contains("No runtime override"));
}

#[test]
fn test_resolve_window() {
    let harness = CliTestHarness::new();
    harness
        .run_success(&[
            "series", "add", "Heater",
            "--endpoint", "opc.tcp://plc",
            "--node-id", "ns=2;s=Heater",
            "--value", "1",
            "--rrule", "FREQ=DAILY;BYHOUR=9;BYMINUTE=0;DTSTART:20260216T090000;DURATION=PT1H",
        ]);
    harness
        .run_success(&["resolve", "--from", "2026-02-16T00:00:00Z", "--to", "2026-02-20T00:00:00Z"])
        .stdout(predicate::str::contains("Heater"));
}

#[test]
fn test_status_with_no_series_is_idle() {
    let harness = CliTestHarness::new();
    harness.run_success(&["status"]).stdout(predicate::str::contains("idle"));
}
