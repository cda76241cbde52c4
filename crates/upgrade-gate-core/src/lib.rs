// crates/upgrade-gate-core/src/lib.rs
// ============================================================================
// Module: Upgrade Gate Core Library
// Description: Public API surface for the Upgrade Gate core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Upgrade Gate applies a precomputed, ordered multi-schema upgrade plan
//! through an external migration runner. Before the first step it verifies
//! that the installed product version matches the plan's starting version,
//! and it stops at the first failure without attempting recovery. It never
//! connects to a database itself; runners and version stores are supplied
//! through the [`interfaces`] module.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::Runner;
pub use interfaces::RunnerError;
pub use interfaces::RunnerFactory;
pub use interfaces::VersionStore;
pub use interfaces::VersionStoreError;
pub use runtime::CancellationToken;
pub use runtime::InMemoryVersionStore;
pub use runtime::RecordingRunner;
pub use runtime::RunnerJournal;
pub use runtime::SKIP_VERSION_CHECK_HINT;
pub use runtime::UpgradeError;
pub use runtime::UpgradeExecutor;
pub use runtime::UpgradeOutcome;
pub use runtime::VersionCheckStatus;
pub use runtime::VersionError;
pub use runtime::check_version;
