// crates/upgrade-gate-cli/tests/i18n.rs
// ============================================================================
// Module: CLI i18n Tests
// Description: Exercises the translation catalog and placeholder substitution.
// Purpose: Ensure CLI user-facing strings route through stable i18n helpers.
// Dependencies: upgrade-gate-cli i18n module and the `t!` macro.
// ============================================================================

//! ## Overview
//! Validates catalog lookups, key fallback, and [`t!`](upgrade_gate_cli::t)
//! placeholder formatting.

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

use upgrade_gate_cli::i18n::MessageArg;
use upgrade_gate_cli::i18n::translate;
use upgrade_gate_cli::t;

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Confirms catalog entries resolve and replace placeholders.
#[test]
fn translate_substitutes_placeholders() {
    let args = vec![MessageArg::new("hash", "sha256:00")];
    assert_eq!(translate("plan.hash", args), "Plan hash: sha256:00");
}

/// Confirms missing keys fall back to the key string.
#[test]
fn translate_falls_back_to_key() {
    assert_eq!(translate("missing.key", Vec::new()), "missing.key");
}

/// Confirms the macro formats every named argument.
#[test]
fn t_macro_formats_arguments() {
    let message = t!("upgrade.ok", steps = 2, from = "5.0", to = "5.2");
    assert_eq!(message, "Upgrade complete: 2 step(s) applied, 5.0 -> 5.2.");
}
