// crates/upgrade-gate-core/tests/proptest_version.rs
// ============================================================================
// Module: Version Property-Based Tests
// Description: Property tests for version parsing and comparison.
// Purpose: Detect panics and ordering violations across wide input ranges.
// ============================================================================

//! Property-based tests for version invariants.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use std::cmp::Ordering;

use proptest::prelude::*;
use upgrade_gate_core::Version;
use upgrade_gate_core::compare_versions;

fn version_strategy() -> impl Strategy<Value = Version> {
    (0u32 .. 1000, 0u32 .. 1000, proptest::option::of(0u32 .. 1000)).prop_map(
        |(major, minor, patch)| match patch {
            Some(patch) => Version::with_patch(major, minor, patch),
            None => Version::new(major, minor),
        },
    )
}

proptest! {
    #[test]
    fn parse_never_panics(raw in ".{0,24}") {
        let _ = Version::parse(&raw);
    }

    #[test]
    fn display_output_parses_back(version in version_strategy(), prefixed in any::<bool>()) {
        let text = if prefixed { format!("v{version}") } else { version.to_string() };
        prop_assert_eq!(Version::parse(&text).unwrap(), version);
    }

    #[test]
    fn compare_is_antisymmetric(a in version_strategy(), b in version_strategy()) {
        prop_assert_eq!(compare_versions(a, b), compare_versions(b, a).reverse());
    }

    #[test]
    fn compare_ignores_patch(
        major in 0u32 .. 1000,
        minor in 0u32 .. 1000,
        left in proptest::option::of(0u32 .. 1000),
        right in proptest::option::of(0u32 .. 1000),
    ) {
        let build = |patch: Option<u32>| patch.map_or_else(
            || Version::new(major, minor),
            |patch| Version::with_patch(major, minor, patch),
        );
        prop_assert_eq!(compare_versions(build(left), build(right)), Ordering::Equal);
    }
}
