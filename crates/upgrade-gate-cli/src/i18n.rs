// crates/upgrade-gate-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for future localization support.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The Upgrade Gate CLI stores user-facing strings in a small translation
//! catalog to keep messaging consistent. All runtime output should be routed
//! through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself to avoid panics.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static catalog entries loaded into the localized message bundle.
const CATALOG_ITEMS: &[(&str, &str)] = &[
    ("main.version", "upgrade-gate {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    (
        "input.read_too_large",
        "Refusing to read {kind} at {path} because it is {size} bytes (limit {limit}).",
    ),
    ("input.kind.plan", "upgrade plan"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("config.validate.service", "Service: {service}"),
    ("config.validate.schema", "Schema {schema} (table {table})"),
    ("plan.read_failed", "Failed to read upgrade plan at {path}: {error}"),
    ("plan.parse_failed", "Failed to parse upgrade plan at {path}: {error}"),
    ("plan.invalid", "Upgrade plan at {path} is invalid: {error}"),
    ("plan.hash_failed", "Failed to fingerprint upgrade plan: {error}"),
    ("plan.validate.ok", "Plan valid: {steps} step(s) from {from} to {to}."),
    ("plan.hash", "Plan hash: {hash}"),
    ("plan.show.header", "Upgrade plan {from} -> {to} ({hash})"),
    ("plan.show.step", "Step {step} -> {version}:"),
    ("plan.show.operation", "  {schema}: {kind} {targets}"),
    ("plan.show.no_operations", "  (no schema changes)"),
    ("plan.show.out_of_band", "  out-of-band migrations: {ids}"),
    ("version.parse_failed", "{error}"),
    ("version.compare.less", "less"),
    ("version.compare.equal", "equal"),
    ("version.compare.greater", "greater"),
    ("audit.open_failed", "Failed to open audit log at {path}: {error}"),
    (
        "upgrade.warn.version_check_skipped",
        "Warning: skipping the installed version check; the plan assumes {from}.",
    ),
    ("upgrade.failed", "Upgrade failed: {error}"),
    ("upgrade.ok", "Upgrade complete: {steps} step(s) applied, {from} -> {to}."),
];

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the English fallback catalog while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

/// Returns the static English catalog used by the CLI.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

    CATALOG.get_or_init(|| CATALOG_ITEMS.iter().copied().collect())
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
///
/// # Returns
///
/// A localized [`String`] with placeholders substituted.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
