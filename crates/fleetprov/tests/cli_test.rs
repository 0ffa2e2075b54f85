//! Integration tests for the `fleetprov` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! offline commands and error handling, all without a control plane.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `fleetprov` binary with env isolation.
///
/// Clears all `FLEETPROV_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn fleetprov_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fleetprov");
    cmd.env("HOME", "/tmp/fleetprov-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/fleetprov-test-nonexistent")
        .env_remove("RUST_LOG")
        .env_remove("FLEETPROV_PROFILE")
        .env_remove("FLEETPROV_ENDPOINT")
        .env_remove("FLEETPROV_TOKEN")
        .env_remove("FLEETPROV_CONFIG")
        .env_remove("FLEETPROV_STATE")
        .env_remove("FLEETPROV_OUTPUT")
        .env_remove("FLEETPROV_INSECURE")
        .env_remove("FLEETPROV_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn schema_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../schemas")
}

/// A temp workspace with a config file (no profiles) and a state path.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(extra_stack: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = format!(
            "[stack]\n\
             account = \"123456789012\"\n\
             region = \"eu-central-1\"\n\
             schema_dir = {schema_dir:?}\n\
             {extra_stack}\n\
             \n\
             [engine]\n\
             state_path = {state:?}\n",
            schema_dir = schema_dir().display().to_string(),
            state = dir.path().join("state.json").display().to_string(),
        );
        std::fs::write(dir.path().join("config.toml"), config).unwrap();
        Self { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn state(&self) -> PathBuf {
        self.dir.path().join("state.json")
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = fleetprov_cmd();
        cmd.arg("--config").arg(self.config());
        cmd
    }

    /// Seed the state file with a single recorded thing.
    fn record_thing(&self) {
        let state = serde_json::json!({
            "version": 1,
            "records": [{
                "logicalName": "thing",
                "service": "iot",
                "action": "CreateThing",
                "physicalId": "vehicle-ros2-test",
                "fingerprint": "0f0f",
                "response": { "thingName": "vehicle-ros2-test" },
                "sequence": 1,
                "createdAt": "2026-01-01T00:00:00Z",
                "updatedAt": "2026-01-01T00:00:00Z"
            }]
        });
        std::fs::write(self.state(), state.to_string()).unwrap();
    }
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = fleetprov_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    fleetprov_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("fleet telemetry")
            .and(predicate::str::contains("plan"))
            .and(predicate::str::contains("apply"))
            .and(predicate::str::contains("destroy"))
            .and(predicate::str::contains("state")),
    );
}

#[test]
fn test_version_flag() {
    fleetprov_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetprov"));
}

#[test]
fn test_invalid_subcommand() {
    let output = fleetprov_cmd().arg("provision").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    fleetprov_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    fleetprov_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Offline commands ────────────────────────────────────────────────

#[test]
fn test_validate_counts_resources() {
    let ws = Workspace::new("");
    ws.cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("17 resources"));
}

#[test]
fn test_validate_rejects_signal_outside_catalog() {
    let ws = Workspace::new("campaign_signals = [\"Vehicle.Unknown\"]");
    let output = ws.cmd().arg("validate").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Vehicle.Unknown"), "{text}");
}

#[test]
fn test_missing_account_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[stack]\nregion = \"eu-central-1\"\n").unwrap();
    let output = fleetprov_cmd()
        .arg("--config")
        .arg(&config)
        .arg("validate")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("account"));
}

#[test]
fn test_plan_is_offline_and_predicts_creates() {
    let ws = Workspace::new("");
    let output = ws.cmd().args(["plan", "-o", "json"]).output().unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let changes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let changes = changes.as_array().unwrap();
    assert_eq!(changes.len(), 17);
    assert_eq!(changes[0]["name"], "bucket-policy");
    assert_eq!(changes[0]["prediction"], "create");
    assert_eq!(changes[16]["name"], "campaign");
    assert!(!ws.state().exists(), "plan must not write state");
}

#[test]
fn test_outputs_follow_device_name() {
    let ws = Workspace::new("device_name = \"truck-7\"");
    let output = ws.cmd().args(["outputs", "-o", "json"]).output().unwrap();
    assert!(output.status.success());
    let outputs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outputs["vehicleName"], "truck-7");
    assert_eq!(outputs["secretName"], "truck-7-certificate");
    assert_eq!(
        outputs["bucketName"],
        "vision-system-data-123456789012-eu-central-1"
    );
}

// ── State store ─────────────────────────────────────────────────────

#[test]
fn test_state_list_empty() {
    let ws = Workspace::new("");
    ws.cmd()
        .args(["state", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No resources recorded"));
}

#[test]
fn test_state_list_and_show() {
    let ws = Workspace::new("");
    ws.record_thing();

    ws.cmd()
        .args(["state", "list", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("thing"));

    let output = ws
        .cmd()
        .args(["state", "show", "thing", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let record: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(record["physicalId"], "vehicle-ros2-test");
}

#[test]
fn test_state_show_unknown_resource() {
    let ws = Workspace::new("");
    let output = ws.cmd().args(["state", "show", "vehicle"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_state_forget_requires_yes_when_non_interactive() {
    let ws = Workspace::new("");
    ws.record_thing();
    let output = ws.cmd().args(["state", "forget", "thing"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));

    ws.cmd()
        .args(["state", "forget", "thing", "--yes"])
        .assert()
        .success();
    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(ws.state()).unwrap()).unwrap();
    assert_eq!(state["records"].as_array().unwrap().len(), 0);
}

// ── Remote commands without a control plane ─────────────────────────

#[test]
fn test_destroy_with_empty_state_is_a_no_op() {
    let ws = Workspace::new("");
    ws.cmd()
        .arg("destroy")
        .assert()
        .success()
        .stderr(predicate::str::contains("Nothing to destroy"));
}

#[test]
fn test_apply_without_profile_fails_before_any_call() {
    let ws = Workspace::new("");
    let output = ws.cmd().arg("apply").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("config init"));
    assert!(!ws.state().exists());
}

#[test]
fn test_destroy_without_profile_keeps_state() {
    let ws = Workspace::new("");
    ws.record_thing();
    let output = ws.cmd().args(["destroy", "--yes"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(ws.state().exists());
}

#[test]
fn test_destroy_target_must_be_declared() {
    let ws = Workspace::new("");
    ws.record_thing();
    let output = ws
        .cmd()
        .args(["destroy", "--target", "ghost", "--yes"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("ghost"));
    assert!(ws.state().exists());
}

#[test]
fn test_destroy_target_with_nothing_recorded_below_it() {
    let ws = Workspace::new("");
    ws.record_thing();
    ws.cmd()
        .args(["destroy", "--target", "certificate"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Nothing to destroy"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    let ws = Workspace::new("");
    ws.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_redacts_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        "[profiles.prod]\nendpoint = \"https://provision.example.com\"\ntoken = \"s3cr3t\"\n",
    )
    .unwrap();
    fleetprov_cmd()
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("****").and(predicate::str::contains("s3cr3t").not()));
}
