// crates/upgrade-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Upgrade Gate Runtime
// Description: Version gate, step executor, cancellation, and audit sinks.
// Purpose: Execute upgrade plans against migration runners.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the pre-flight version gate and the step
//! executor. Every caller (CLI or embedding service) goes through
//! [`UpgradeExecutor::run`] so that ordering and failure semantics stay
//! identical across surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod cancel;
pub mod executor;
pub mod gate;
pub mod memory;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::InMemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::UpgradeAuditEvent;
pub use audit::UpgradeAuditSink;
pub use audit::UpgradeEventKind;
pub use cancel::CancellationToken;
pub use executor::SKIP_VERSION_CHECK_HINT;
pub use executor::UpgradeError;
pub use executor::UpgradeExecutor;
pub use executor::UpgradeOutcome;
pub use executor::VersionCheckStatus;
pub use executor::step_options;
pub use gate::VersionError;
pub use gate::check_store_version;
pub use gate::check_version;
pub use memory::InMemoryVersionStore;
pub use memory::RecordingRunner;
pub use memory::RunnerJournal;
