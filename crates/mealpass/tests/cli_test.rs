//! Integration tests for the `mealpass` CLI binary.
//!
//! Every test runs against its own temporary config file and record store,
//! so nothing touches the operator's real data.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// A throwaway home directory holding the config file and database.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config_path(&self) -> std::path::PathBuf {
        self.dir.path().join("config.toml")
    }

    /// Build a [`Command`] for the `mealpass` binary with env isolation.
    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("mealpass");
        cmd.env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("xdg-config"))
            .env("XDG_DATA_HOME", self.dir.path().join("xdg-data"))
            .env("MEALPASS_CONFIG", self.config_path())
            .env("MEALPASS_DB", self.dir.path().join("records.db"))
            .env("NO_COLOR", "1")
            .env_remove("MEALPASS_OUTPUT")
            .env_remove("MEALPASS_UTC_OFFSET")
            .env_remove("MEALPASS_MEALS__POLICY")
            .env_remove("MEALPASS_CODES__TTL_MINUTES")
            .env_remove("MEALPASS_CODES__LENGTH")
            .env_remove("RUST_LOG");
        cmd
    }

    fn enroll(&self, name: &str, id: u32) {
        self.cmd()
            .args(["students", "add", name, "--id", &id.to_string()])
            .assert()
            .success();
    }
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let sandbox = Sandbox::new();
    let output = sandbox.cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    Sandbox::new().cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("canteen")
            .and(predicate::str::contains("verify"))
            .and(predicate::str::contains("codes"))
            .and(predicate::str::contains("students")),
    );
}

#[test]
fn test_short_help_flag() {
    Sandbox::new()
        .cmd()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("canteen counter"));
}

#[test]
fn test_version_flag() {
    Sandbox::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mealpass"));
}

#[test]
fn test_completions_zsh() {
    Sandbox::new()
        .cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_subcommand() {
    let output = Sandbox::new().cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected error naming the subcommand:\n{text}");
}

// ── Students ────────────────────────────────────────────────────────

#[test]
fn test_students_add_and_list() {
    let sandbox = Sandbox::new();
    sandbox.enroll("Asha Rao", 1);
    sandbox
        .cmd()
        .args(["students", "add", "Ravi Kumar", "--until", "2030-01-31"])
        .assert()
        .success();

    let output = sandbox
        .cmd()
        .args(["students", "list", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let students = stdout_json(&output);
    let students = students.as_array().unwrap();
    assert_eq!(students.len(), 2);

    let ravi = students.iter().find(|s| s["name"] == "Ravi Kumar").unwrap();
    assert_eq!(ravi["short_id"], 2, "next free card number");
    assert_eq!(ravi["subscription_end_date"], "2030-01-31");
}

#[test]
fn test_students_duplicate_card_number_conflicts() {
    let sandbox = Sandbox::new();
    sandbox.enroll("Asha Rao", 1);
    let output = sandbox
        .cmd()
        .args(["students", "add", "Someone Else", "--id", "1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
}

#[test]
fn test_students_plain_output() {
    let sandbox = Sandbox::new();
    sandbox.enroll("Asha Rao", 4);
    sandbox
        .cmd()
        .args(["students", "list", "-o", "plain"])
        .assert()
        .success()
        .stdout("4\n");
}

// ── Verify ──────────────────────────────────────────────────────────

#[test]
fn test_verify_id_logs_once() {
    let sandbox = Sandbox::new();
    sandbox.enroll("Asha Rao", 1);

    sandbox
        .cmd()
        .args(["verify", "id", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("logged for Asha Rao"));

    let output = sandbox.cmd().args(["verify", "id", "#1"]).output().unwrap();
    assert_eq!(output.status.code(), Some(11));
    let text = combined_output(&output);
    assert!(text.contains("already logged for Asha Rao"), "{text}");
}

#[test]
fn test_verify_unknown_id() {
    let sandbox = Sandbox::new();
    let output = sandbox.cmd().args(["verify", "id", "99"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("No student found for #99"));
}

#[test]
fn test_verify_inactive_student() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["students", "add", "Ravi Kumar", "--id", "3", "--inactive"])
        .assert()
        .success();

    let output = sandbox
        .cmd()
        .args(["verify", "id", "3", "-o", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(10));
    let outcome = stdout_json(&output);
    assert_eq!(outcome["status"], "failure");
    assert_eq!(outcome["reason"]["reason"], "subscription_inactive");
}

#[test]
fn test_deactivate_requires_yes_without_terminal() {
    let sandbox = Sandbox::new();
    sandbox.enroll("Asha Rao", 1);
    let output = sandbox
        .cmd()
        .args(["students", "deactivate", "1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    sandbox
        .cmd()
        .args(["students", "deactivate", "1", "-y"])
        .assert()
        .success();
    let output = sandbox.cmd().args(["verify", "id", "1"]).output().unwrap();
    assert_eq!(output.status.code(), Some(10));
}

// ── Delegated codes ─────────────────────────────────────────────────

#[test]
fn test_code_issue_and_redeem() {
    let sandbox = Sandbox::new();
    sandbox.enroll("Meera Shah", 7);

    let output = sandbox
        .cmd()
        .args(["codes", "issue", "7", "-o", "plain"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let code = String::from_utf8(output.stdout).unwrap().trim().to_owned();
    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|b| b.is_ascii_digit()));

    let output = sandbox
        .cmd()
        .args(["verify", "code", &code, "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let outcome = stdout_json(&output);
    assert_eq!(outcome["status"], "success");
    assert_eq!(outcome["method"], "DELEGATED_CODE");
    assert_eq!(outcome["student"]["name"], "Meera Shah");

    // Single use
    let output = sandbox.cmd().args(["verify", "code", &code]).output().unwrap();
    assert_eq!(output.status.code(), Some(13));
}

#[test]
fn test_code_issue_unknown_student() {
    let sandbox = Sandbox::new();
    let output = sandbox.cmd().args(["codes", "issue", "5"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_code_revoke() {
    let sandbox = Sandbox::new();
    sandbox.enroll("Meera Shah", 7);
    let output = sandbox
        .cmd()
        .args(["codes", "issue", "7", "-o", "plain"])
        .output()
        .unwrap();
    let code = String::from_utf8(output.stdout).unwrap().trim().to_owned();

    sandbox
        .cmd()
        .args(["codes", "revoke", &code, "-y"])
        .assert()
        .success();
    let output = sandbox.cmd().args(["verify", "code", &code]).output().unwrap();
    assert_eq!(output.status.code(), Some(13));
}

// ── Log ─────────────────────────────────────────────────────────────

#[test]
fn test_log_lists_todays_meals() {
    let sandbox = Sandbox::new();
    sandbox.enroll("Asha Rao", 1);
    sandbox.cmd().args(["verify", "id", "1"]).assert().success();

    let output = sandbox.cmd().args(["log", "-o", "json"]).output().unwrap();
    assert!(output.status.success());
    let entries = stdout_json(&output);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "Asha Rao");
    assert_eq!(entries[0]["short_id"], 1);
    assert_eq!(entries[0]["method"], "SELF_ID");
}

#[test]
fn test_log_for_empty_day() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["log", "--date", "2020-01-01", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[]"));
}

// ── Counter ─────────────────────────────────────────────────────────

#[test]
fn test_counter_reads_stdin() {
    let sandbox = Sandbox::new();
    sandbox.enroll("Asha Rao", 1);

    let output = sandbox
        .cmd()
        .arg("counter")
        .write_stdin("1\n1\n#42\n")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "{stdout}");
    assert!(lines[0].contains("✓") && lines[0].contains("logged for Asha Rao"));
    assert!(lines[1].contains("already logged for Asha Rao"));
    assert!(lines[2].contains("No student found for #42"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("1 logged, 2 rejected"));
}

// ── Hours & config ──────────────────────────────────────────────────

#[test]
fn test_hours_plain_prints_current_slot() {
    Sandbox::new()
        .cmd()
        .args(["hours", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::is_match("^(LUNCH|DINNER)\n$").unwrap());
}

#[test]
fn test_config_path_honours_flag() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_exists() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["config", "init", "-y"]).assert().success();
    assert!(sandbox.config_path().exists());

    let output = sandbox.cmd().args(["config", "init", "-y"]).output().unwrap();
    assert_eq!(output.status.code(), Some(6));

    sandbox
        .cmd()
        .args(["config", "init", "-y", "--force"])
        .assert()
        .success();
}

#[test]
fn test_config_show_reflects_file() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.config_path(),
        "utc_offset = \"+05:30\"\n\n[codes]\nttl_minutes = 10\n",
    )
    .unwrap();

    let output = sandbox
        .cmd()
        .args(["config", "show", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let cfg = stdout_json(&output);
    assert_eq!(cfg["utc_offset"], "+05:30");
    assert_eq!(cfg["codes"]["ttl_minutes"], 10);
    assert_eq!(cfg["codes"]["length"], 6);
}

#[test]
fn test_invalid_config_is_a_usage_error() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.config_path(), "[meals]\npolicy = \"sometimes\"\n").unwrap();
    let output = sandbox.cmd().args(["hours"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("policy"));
}
