// crates/upgrade-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: Upgrade Version Gate
// Description: Pre-flight check of the installed version against a plan.
// Purpose: Refuse to start an upgrade from an unexpected starting state.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! The gate reads the version recorded by a service through the runner's
//! database handle and requires it to match the plan's starting release.
//! It is read-only and fails closed: a missing record is never treated as a
//! fresh install.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use thiserror::Error;

use crate::core::ServiceName;
use crate::core::UpgradePlan;
use crate::core::Version;
use crate::core::VersionParseError;
use crate::core::compare_versions;
use crate::interfaces::Runner;
use crate::interfaces::RunnerError;
use crate::interfaces::VersionStore;
use crate::interfaces::VersionStoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons the version gate rejects an installation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The runner could not provide a database handle.
    #[error("failed to open version store: {0}")]
    Database(#[source] RunnerError),
    /// The version record could not be read.
    #[error(transparent)]
    Store(#[from] VersionStoreError),
    /// The recorded version is malformed.
    #[error(transparent)]
    Parse(#[from] VersionParseError),
    /// No version is recorded for the service.
    #[error("version assertion failed: unknown version != {:?}", .expected.to_string())]
    UnknownVersion {
        /// Version the plan starts from.
        expected: Version,
    },
    /// The recorded version differs from the plan's starting version.
    #[error(
        "version assertion failed: {:?} != {:?}",
        .actual.to_string(),
        .expected.to_string()
    )]
    Mismatch {
        /// Version recorded by the service.
        actual: Version,
        /// Version the plan starts from.
        expected: Version,
    },
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Checks that `service` is recorded at the plan's starting release.
///
/// # Errors
///
/// Returns [`VersionError`] when the record is unreadable, absent, malformed,
/// or names a different release.
pub fn check_version<R>(
    runner: &R,
    service: &ServiceName,
    plan: &UpgradePlan,
) -> Result<(), VersionError>
where
    R: Runner + ?Sized,
{
    let store = runner.database_handle().map_err(VersionError::Database)?;
    check_store_version(&store, service, plan.from)
}

/// Checks a version store directly against an expected release.
///
/// # Errors
///
/// Returns [`VersionError`] under the same conditions as [`check_version`].
pub fn check_store_version<S>(
    store: &S,
    service: &ServiceName,
    expected: Version,
) -> Result<(), VersionError>
where
    S: VersionStore + ?Sized,
{
    let Some(raw) = store.service_version(service)? else {
        return Err(VersionError::UnknownVersion {
            expected,
        });
    };
    let actual = Version::parse(&raw)?;
    if compare_versions(actual, expected) == Ordering::Equal {
        return Ok(());
    }
    Err(VersionError::Mismatch {
        actual,
        expected,
    })
}
