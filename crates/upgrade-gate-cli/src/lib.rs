// crates/upgrade-gate-cli/src/lib.rs
// ============================================================================
// Module: Upgrade Gate CLI Library
// Description: Shared helpers for the Upgrade Gate command-line interface.
// Purpose: Provide reusable components (i18n, file-backed state) for the CLI.
// Dependencies: upgrade-gate-core, serde, serde_json, tempfile, thiserror
// ============================================================================

//! ## Overview
//! This library module houses shared CLI utilities: the message catalog and
//! the file-backed state runner used to rehearse upgrades without a
//! database. The binary entry point (`src/main.rs`) imports these helpers to
//! keep all user-facing output consistent.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Internationalization helpers and message catalog.
pub mod i18n;
/// File-backed upgrade state and runner.
pub mod state;
