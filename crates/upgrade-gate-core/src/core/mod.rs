// crates/upgrade-gate-core/src/core/mod.rs
// ============================================================================
// Module: Upgrade Gate Core Types
// Description: Versions, identifiers, schemas, and upgrade plans.
// Purpose: Provide stable, serializable types shared by the gate and executor.
// Dependencies: serde, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Core types are pure data: nothing here talks to a runner or a version
//! store. Plans and definitions arrive fully built from upstream.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod hashing;
pub mod identifiers;
pub mod plan;
pub mod schema;
pub mod version;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::DEFAULT_SERVICE_NAME;
pub use identifiers::MigrationId;
pub use identifiers::SchemaName;
pub use identifiers::ServiceName;
pub use identifiers::format_migration_ids;
pub use plan::MigrationOperation;
pub use plan::OperationKind;
pub use plan::PlanError;
pub use plan::PrivilegedMode;
pub use plan::RunnerOptions;
pub use plan::UpgradePlan;
pub use plan::UpgradeStep;
pub use schema::Definition;
pub use schema::Definitions;
pub use schema::Schema;
pub use schema::SchemaSlot;
pub use schema::SchemaUniverse;
pub use schema::SchemaUniverseError;
pub use schema::default_migrations_table;
pub use version::Version;
pub use version::VersionParseError;
pub use version::compare_versions;
