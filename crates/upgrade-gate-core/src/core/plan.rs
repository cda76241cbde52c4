// crates/upgrade-gate-core/src/core/plan.rs
// ============================================================================
// Module: Upgrade Gate Plans
// Description: Upgrade plans, steps, migration operations, and runner options.
// Purpose: Define the data contract between the plan builder, executor, and runner.
// Dependencies: crate::core::{hashing, identifiers, schema, version}, serde, thiserror
// ============================================================================

//! ## Overview
//! An [`UpgradePlan`] is built upstream and consumed here. Its steps are
//! ordered by increasing instance version and each step names the leaf
//! migrations every touched schema must reach. The executor trusts that
//! ordering; [`UpgradePlan::validate`] exists for operator tooling that wants
//! to check a plan file before handing it over.
//!
//! Leaf mappings are ordered maps so that per-step operation batches are
//! always produced in lexicographic schema-name order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::MigrationId;
use crate::core::identifiers::SchemaName;
use crate::core::identifiers::format_migration_ids;
use crate::core::schema::Definitions;
use crate::core::schema::SchemaUniverse;
use crate::core::version::Version;
use crate::core::version::compare_versions;

// ============================================================================
// SECTION: Plan Types
// ============================================================================

/// Precomputed upgrade from one product version to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePlan {
    /// Version the installation must currently be at.
    pub from: Version,
    /// Version the installation reaches after the last step.
    pub to: Version,
    /// Stitched migration definitions keyed by schema name.
    #[serde(default)]
    pub definitions: BTreeMap<SchemaName, Definitions>,
    /// Ordered upgrade steps.
    #[serde(default)]
    pub steps: Vec<UpgradeStep>,
}

/// One step of an upgrade plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeStep {
    /// Instance version reached once this step is applied.
    pub version: Version,
    /// Leaf migrations each touched schema must reach by the end of the step.
    #[serde(default)]
    pub leaf_ids: BTreeMap<SchemaName, Vec<MigrationId>>,
    /// Out-of-band migrations associated with the step (normally empty).
    #[serde(default)]
    pub out_of_band_migration_ids: Vec<MigrationId>,
}

impl UpgradePlan {
    /// Returns the definitions supplied for `name`, or an empty set.
    #[must_use]
    pub fn definitions_for(&self, name: &SchemaName) -> Definitions {
        self.definitions.get(name).cloned().unwrap_or_default()
    }

    /// Computes the canonical fingerprint of this plan.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the plan cannot be canonicalized.
    pub fn canonical_hash(&self) -> Result<HashDigest, HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }

    /// Checks the structural invariants a plan builder is expected to uphold.
    ///
    /// The executor never calls this; it trusts the plan as given.
    ///
    /// # Errors
    ///
    /// Returns the first [`PlanError`] found.
    pub fn validate(&self, universe: &SchemaUniverse) -> Result<(), PlanError> {
        if compare_versions(self.from, self.to) == Ordering::Greater {
            return Err(PlanError::Downgrade {
                from: self.from,
                to: self.to,
            });
        }
        for name in self.definitions.keys() {
            if !universe.contains(name) {
                return Err(PlanError::UnknownSchema {
                    step: None,
                    schema: name.clone(),
                });
            }
        }

        let mut previous_version = self.from;
        let mut previous_leaves: BTreeMap<&SchemaName, &[MigrationId]> = BTreeMap::new();
        for (index, step) in self.steps.iter().enumerate() {
            if compare_versions(step.version, previous_version) != Ordering::Greater {
                return Err(PlanError::StepOrder {
                    step: index,
                    version: step.version,
                    previous: previous_version,
                });
            }
            for (schema, leaves) in &step.leaf_ids {
                if !universe.contains(schema) {
                    return Err(PlanError::UnknownSchema {
                        step: Some(index),
                        schema: schema.clone(),
                    });
                }
                let Some(definitions) = self.definitions.get(schema) else {
                    return Err(PlanError::MissingDefinitions {
                        step: index,
                        schema: schema.clone(),
                    });
                };
                let unknown: Vec<MigrationId> =
                    leaves.iter().copied().filter(|id| definitions.get(*id).is_none()).collect();
                if !unknown.is_empty() {
                    return Err(PlanError::UnknownLeaves {
                        step: index,
                        schema: schema.clone(),
                        ids: unknown,
                    });
                }
                if let Some(before) = previous_leaves.get(schema) {
                    let reachable = definitions.ancestors_inclusive(leaves);
                    let regressed: Vec<MigrationId> =
                        before.iter().copied().filter(|id| !reachable.contains(id)).collect();
                    if !regressed.is_empty() {
                        return Err(PlanError::Regression {
                            step: index,
                            schema: schema.clone(),
                            ids: regressed,
                        });
                    }
                }
                previous_leaves.insert(schema, leaves);
            }
            previous_version = step.version;
        }

        if let Some(last) = self.steps.last()
            && compare_versions(last.version, self.to) != Ordering::Equal
        {
            return Err(PlanError::FinalVersion {
                last: last.version,
                to: self.to,
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Plan Errors
// ============================================================================

/// Structural problems detected by [`UpgradePlan::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The plan goes backwards.
    #[error("plan goes from {from} to {to}; downgrades are not supported")]
    Downgrade {
        /// Declared starting version.
        from: Version,
        /// Declared target version.
        to: Version,
    },
    /// A step does not advance past its predecessor.
    #[error("step {step} targets {version}, which does not follow {previous}")]
    StepOrder {
        /// Step index.
        step: usize,
        /// Version of the offending step.
        version: Version,
        /// Version of the previous step (or the plan's starting version).
        previous: Version,
    },
    /// The last step does not land on the declared target.
    #[error("last step targets {last} but the plan declares {to}")]
    FinalVersion {
        /// Version of the last step.
        last: Version,
        /// Declared target version.
        to: Version,
    },
    /// A schema is not part of the universe.
    #[error("unknown schema {schema}{}", step_suffix(.step))]
    UnknownSchema {
        /// Step index, when the schema was named by a step.
        step: Option<usize>,
        /// Offending schema name.
        schema: SchemaName,
    },
    /// A step names a schema with no definitions in the plan.
    #[error("step {step} targets schema {schema}, which has no definitions")]
    MissingDefinitions {
        /// Step index.
        step: usize,
        /// Offending schema name.
        schema: SchemaName,
    },
    /// A step names leaf migrations absent from the definitions.
    #[error("step {step} targets unknown migrations {} in schema {schema}", format_migration_ids(.ids))]
    UnknownLeaves {
        /// Step index.
        step: usize,
        /// Schema name.
        schema: SchemaName,
        /// Unknown leaf identifiers.
        ids: Vec<MigrationId>,
    },
    /// A step would leave previously reached migrations behind.
    #[error("step {step} regresses schema {schema}: {} no longer reachable", format_migration_ids(.ids))]
    Regression {
        /// Step index.
        step: usize,
        /// Schema name.
        schema: SchemaName,
        /// Earlier leaves not reachable from this step's leaves.
        ids: Vec<MigrationId>,
    },
}

/// Renders the optional step location for schema errors.
fn step_suffix(step: &Option<usize>) -> String {
    step.map_or_else(String::new, |step| format!(" in step {step}"))
}

// ============================================================================
// SECTION: Migration Operations
// ============================================================================

/// Kind of migration operation a runner is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Apply every pending migration.
    Upgrade,
    /// Apply migrations up to and including the target leaves.
    TargetedUp,
    /// Roll back to the target migrations.
    TargetedDown,
    /// Revert a single migration.
    Revert,
}

impl OperationKind {
    /// Returns the wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upgrade => "upgrade",
            Self::TargetedUp => "targeted_up",
            Self::TargetedDown => "targeted_down",
            Self::Revert => "revert",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single per-schema instruction handed to the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOperation {
    /// Schema the operation applies to.
    pub schema_name: SchemaName,
    /// Operation kind.
    pub kind: OperationKind,
    /// Target migrations.
    pub target_versions: Vec<MigrationId>,
}

impl MigrationOperation {
    /// Builds a targeted-up operation.
    #[must_use]
    pub fn targeted_up(schema_name: SchemaName, target_versions: Vec<MigrationId>) -> Self {
        Self {
            schema_name,
            kind: OperationKind::TargetedUp,
            target_versions,
        }
    }
}

// ============================================================================
// SECTION: Runner Options
// ============================================================================

/// How a runner treats migrations that need elevated permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegedMode {
    /// Apply privileged migrations like any other.
    Apply,
    /// Record privileged migrations as applied without running them.
    Noop,
    /// Refuse to proceed when a privileged migration is pending.
    Refuse,
}

/// Configuration passed to a single runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerOptions {
    /// Operations to perform, one per schema.
    pub operations: Vec<MigrationOperation>,
    /// Privileged migration handling.
    pub privileged_mode: PrivilegedMode,
    /// Expected fingerprint of manually applied privileged migrations.
    pub privileged_hash: Option<String>,
    /// Tolerate exactly one pre-existing dirty migration log entry.
    pub ignore_single_dirty_log: bool,
}
