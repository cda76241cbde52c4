// crates/upgrade-gate-cli/tests/plan_commands.rs
// ============================================================================
// Module: CLI Inspection Command Tests
// Description: Integration tests for plan, version, and config commands.
// Purpose: Ensure read-only commands report stable, localized output.
// Dependencies: upgrade-gate-cli binary
// ============================================================================
//! ## Overview
//! Exercises `plan validate`, `plan show`, `version compare`, and
//! `config validate` through the compiled binary.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn upgrade_gate_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_upgrade-gate"))
}

fn run(args: &[&str]) -> Output {
    Command::new(upgrade_gate_bin())
        .args(args)
        .env_remove("UPGRADE_GATE_CONFIG")
        .output()
        .expect("run upgrade-gate")
}

fn write_config(dir: &Path, body: &str) -> String {
    let path = dir.join("upgrade-gate.toml");
    fs::write(&path, body).expect("write config");
    path.to_string_lossy().into_owned()
}

fn write_plan(dir: &Path, plan: &serde_json::Value) -> String {
    let path = dir.join("plan.json");
    fs::write(&path, plan.to_string()).expect("write plan");
    path.to_string_lossy().into_owned()
}

fn sample_plan() -> serde_json::Value {
    json!({
        "from": "5.0",
        "to": "5.1",
        "definitions": {
            "frontend": [{"id": 1, "name": "init"}],
            "codeinsights": [{"id": 20, "name": "init"}]
        },
        "steps": [
            {"version": "5.1", "leaf_ids": {"frontend": [1], "codeinsights": [20]}}
        ]
    })
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// SECTION: Plan Commands
// ============================================================================

/// Verifies a valid plan reports its step count and fingerprint.
#[test]
fn plan_validate_reports_summary_and_hash() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path(), "");
    let plan = write_plan(dir.path(), &sample_plan());

    let output = run(&["plan", "validate", "--plan", &plan, "--config", &config]);
    assert!(output.status.success(), "unexpected failure: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Plan valid: 1 step(s) from 5.0 to 5.1."), "unexpected stdout: {out}");
    assert!(out.contains("Plan hash: sha256:"), "unexpected stdout: {out}");
}

/// Verifies schemas outside the configured universe are rejected.
#[test]
fn plan_validate_rejects_schema_outside_config() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path(), "[[schemas]]\nname = \"frontend\"\n");
    let plan = write_plan(dir.path(), &sample_plan());

    let output = run(&["plan", "validate", "--plan", &plan, "--config", &config]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("is invalid: unknown schema codeinsights"), "unexpected stderr: {err}");
}

/// Verifies malformed plan JSON is reported as a parse failure.
#[test]
fn plan_validate_rejects_malformed_json() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path(), "");
    let path = dir.path().join("plan.json");
    fs::write(&path, "{\"from\": ").expect("write plan");

    let output =
        run(&["plan", "validate", "--plan", path.to_string_lossy().as_ref(), "--config", &config]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to parse upgrade plan"));
}

/// Verifies plan show prints operations in dispatch order.
#[test]
fn plan_show_prints_dispatch_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path(), "");
    let plan = write_plan(dir.path(), &sample_plan());

    let output = run(&["plan", "show", "--plan", &plan, "--config", &config]);
    assert!(output.status.success(), "unexpected failure: {}", stderr(&output));
    let out = stdout(&output);
    let insights = out.find("codeinsights: targeted_up [20]").expect("codeinsights line");
    let frontend = out.find("frontend: targeted_up [1]").expect("frontend line");
    assert!(insights < frontend, "unexpected order: {out}");
}

// ============================================================================
// SECTION: Version Commands
// ============================================================================

/// Verifies version comparison ignores patch components.
#[test]
fn version_compare_ignores_patch() {
    let cases = [("5.2.1", "v5.2", "equal"), ("5.1", "5.2.0", "less"), ("5.10", "5.9", "greater")];
    for (left, right, expected) in cases {
        let output = run(&["version", "compare", left, right]);
        assert!(output.status.success(), "unexpected failure: {}", stderr(&output));
        assert_eq!(stdout(&output).trim(), expected, "{left} vs {right}");
    }
}

/// Verifies unparsable versions are rejected with the parse message.
#[test]
fn version_compare_rejects_garbage() {
    let output = run(&["version", "compare", "banana", "5.2"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("cannot parse version: \"banana\""));
}

/// Verifies the version flag prints the package version.
#[test]
fn version_flag_prints_package_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), format!("upgrade-gate {}", env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Verifies config validation lists the resolved schema universe.
#[test]
fn config_validate_lists_schemas() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(
        dir.path(),
        "[service]\nname = \"frontend\"\n\n[[schemas]]\nname = \"frontend\"\n\n[[schemas]]\nname = \
         \"codeintel\"\n",
    );

    let output = run(&["config", "validate", "--config", &config]);
    assert!(output.status.success(), "unexpected failure: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Config valid."), "unexpected stdout: {out}");
    assert!(out.contains("Schema frontend (table schema_migrations)"), "unexpected stdout: {out}");
    assert!(
        out.contains("Schema codeintel (table codeintel_schema_migrations)"),
        "unexpected stdout: {out}"
    );
}

/// Verifies config validation fails closed on a missing explicit file.
#[test]
fn config_validate_requires_existing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("missing.toml");

    let output = run(&["config", "validate", "--config", missing.to_string_lossy().as_ref()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to load config"));
}
