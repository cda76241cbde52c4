// crates/upgrade-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for bounded reads and plan rendering in the CLI.
// Purpose: Ensure bounded reads fail closed and plan output is deterministic.
// Dependencies: upgrade-gate-cli main helpers
// ============================================================================

//! ## Overview
//! Validates `read_bytes_with_limit` enforces size limits for CLI inputs and
//! that `plan show` rendering follows dispatch order.
//!
//! Security posture: CLI inputs are untrusted; size limits must fail closed.

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

use serde_json::json;
use upgrade_gate_config::UpgradeGateConfig;
use upgrade_gate_core::UpgradePlan;

use super::ReadLimitError;
use super::build_audit_sink;
use super::load_plan;
use super::read_bytes_with_limit;
use super::render_plan;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn sample_plan() -> UpgradePlan {
    serde_json::from_value(json!({
        "from": "5.0",
        "to": "5.2",
        "definitions": {
            "frontend": [{"id": 1, "name": "init"}, {"id": 2, "name": "users", "parents": [1]}],
            "codeintel": [{"id": 10, "name": "init"}]
        },
        "steps": [
            {"version": "5.1", "leaf_ids": {"frontend": [1], "codeintel": [10]}},
            {"version": "5.2", "out_of_band_migration_ids": [7]}
        ]
    }))
    .expect("sample plan")
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("small.bin");
    fs::write(&path, b"ok").expect("write small file");

    let bytes = read_bytes_with_limit(&path, 16).expect("read small file");
    assert_eq!(bytes, b"ok");
}

#[test]
fn read_bytes_with_limit_allows_exact_limit() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("exact.bin");
    fs::write(&path, [0_u8; 16]).expect("write exact file");

    let bytes = read_bytes_with_limit(&path, 16).expect("read exact file");
    assert_eq!(bytes.len(), 16);
}

#[test]
fn read_bytes_with_limit_rejects_large_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("large.bin");
    fs::write(&path, vec![0_u8; 32]).expect("write large file");

    let err = read_bytes_with_limit(&path, 16).expect_err("expected size limit failure");
    match err {
        ReadLimitError::TooLarge {
            size,
            limit,
        } => {
            assert_eq!(size, 32);
            assert_eq!(limit, 16);
        }
        ReadLimitError::Io(err) => panic!("unexpected io error: {err}"),
    }
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = read_bytes_with_limit(&dir.path().join("missing.json"), 16)
        .expect_err("expected io failure");
    assert!(matches!(err, ReadLimitError::Io(_)));
}

// ============================================================================
// SECTION: Plan Loading
// ============================================================================

#[test]
fn load_plan_rejects_invalid_plan_before_execution() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("plan.json");
    fs::write(&path, r#"{"from": "5.2", "to": "5.0"}"#).expect("write plan");
    let config = UpgradeGateConfig::default();
    let universe = config.universe().expect("universe");

    let err = load_plan(&path, &config, &universe).expect_err("downgrade must fail");
    assert!(err.to_string().contains("downgrades are not supported"), "{err}");
}

#[test]
fn load_plan_honors_configured_size_limit() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("plan.json");
    fs::write(&path, serde_json::to_vec(&sample_plan()).expect("encode")).expect("write plan");
    let mut config = UpgradeGateConfig::default();
    config.limits.max_plan_bytes = 8;
    let universe = config.universe().expect("universe");

    let err = load_plan(&path, &config, &universe).expect_err("limit must fail");
    assert!(err.to_string().contains("limit 8"), "{err}");
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

#[test]
fn render_plan_lists_operations_in_dispatch_order() {
    let output = render_plan(&sample_plan(), "sha256:abc");
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Upgrade plan 5.0 -> 5.2 (sha256:abc)",
            "Step 0 -> 5.1:",
            "  codeintel: targeted_up [10]",
            "  frontend: targeted_up [1]",
            "Step 1 -> 5.2:",
            "  (no schema changes)",
            "  out-of-band migrations: [7]",
        ]
    );
}

#[test]
fn disabled_audit_builds_without_touching_disk() {
    let mut config = UpgradeGateConfig::default();
    config.audit.path = Some("/nonexistent/dir/audit.jsonl".to_string());
    assert!(build_audit_sink(&config).is_ok());

    config.audit.enabled = true;
    assert!(build_audit_sink(&config).is_err());
}
