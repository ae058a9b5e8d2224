use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test harness for running CLI commands against a temporary database.
pub struct CliTestHarness {
    _temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        Self { _temp_dir: temp_dir, db_path }
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("scheduler").expect("failed to find scheduler binary");
        cmd.arg("--db").arg(&self.db_path);
        cmd
    }

    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }
}

pub mod assertions {
    use predicates::prelude::*;

    pub fn created_successfully() -> impl Predicate<str> {
        predicate::str::contains("Created").or(predicate::str::contains("Added"))
    }

    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error")
    }
}
