// crates/upgrade-gate-core/src/runtime/executor.rs
// ============================================================================
// Module: Upgrade Step Executor
// Description: Walks an upgrade plan step by step through a migration runner.
// Purpose: Apply a precomputed plan in order and stop at the first failure.
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! [`UpgradeExecutor::run`] is the single execution path for upgrades:
//!
//! `Init -> (VersionCheck) -> Step[0] -> ... -> Step[n-1] -> Done`
//!
//! Any transition may end in a terminal abort. There is no paused state and no
//! rollback: steps applied before a failure stay applied, and a caller that
//! wants to continue must re-invoke from the start. Re-invoking after a clean
//! run is not guarded against duplicate application.
//!
//! Every runner call uses privileged mode [`PrivilegedMode::Apply`], no
//! privileged fingerprint, and no dirty-log tolerance. Fingerprint
//! verification is disabled on this path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::MigrationId;
use crate::core::MigrationOperation;
use crate::core::PrivilegedMode;
use crate::core::RunnerOptions;
use crate::core::Schema;
use crate::core::SchemaName;
use crate::core::SchemaUniverse;
use crate::core::ServiceName;
use crate::core::UpgradePlan;
use crate::core::UpgradeStep;
use crate::core::Version;
use crate::core::format_migration_ids;
use crate::interfaces::Runner;
use crate::interfaces::RunnerError;
use crate::interfaces::RunnerFactory;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::audit::UpgradeAuditEvent;
use crate::runtime::audit::UpgradeAuditEventParams;
use crate::runtime::audit::UpgradeAuditSink;
use crate::runtime::audit::UpgradeEventKind;
use crate::runtime::cancel::CancellationToken;
use crate::runtime::gate::VersionError;
use crate::runtime::gate::check_version;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Operator guidance appended to version check failures.
pub const SKIP_VERSION_CHECK_HINT: &str = "Re-invoke with --skip-version-check to ignore this check";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Terminal upgrade failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeError {
    /// The runner factory failed.
    #[error("failed to construct migration runner: {0}")]
    RunnerConstruction(#[source] RunnerError),
    /// The pre-flight version check failed.
    #[error("{0}. {hint}", hint = SKIP_VERSION_CHECK_HINT)]
    VersionCheck(#[source] VersionError),
    /// A step asks for out-of-band migrations, which this path cannot run.
    #[error(
        "unimplemented: out-of-band migrations {} requested by step {step} ({version}) are not \
         supported by this upgrade path",
        format_migration_ids(.ids)
    )]
    OutOfBandMigrationsUnsupported {
        /// Step index.
        step: usize,
        /// Step instance version.
        version: Version,
        /// Every out-of-band migration named by the step.
        ids: Vec<MigrationId>,
    },
    /// The runner failed while applying a step.
    #[error("{source}")]
    RunnerExecution {
        /// Step index.
        step: usize,
        /// Runner error, forwarded verbatim.
        source: RunnerError,
    },
    /// Cancellation was observed between steps.
    #[error("upgrade cancelled after {completed_steps} completed step(s)")]
    Cancelled {
        /// Steps applied before cancellation was observed.
        completed_steps: usize,
    },
}

impl UpgradeError {
    /// Returns the underlying version error for version check failures.
    #[must_use]
    pub const fn version_error(&self) -> Option<&VersionError> {
        match self {
            Self::VersionCheck(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the index of the step that failed, when the failure is step-scoped.
    #[must_use]
    pub const fn failed_step(&self) -> Option<usize> {
        match self {
            Self::OutOfBandMigrationsUnsupported {
                step,
                ..
            }
            | Self::RunnerExecution {
                step,
                ..
            } => Some(*step),
            Self::Cancelled {
                completed_steps,
            } => Some(*completed_steps),
            Self::RunnerConstruction(_) | Self::VersionCheck(_) => None,
        }
    }
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// How the pre-flight version check was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheckStatus {
    /// The installed version matched the plan.
    Verified,
    /// The caller bypassed the check.
    Skipped,
}

/// Summary of a successful upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeOutcome {
    /// Number of steps the runner applied.
    pub steps_applied: usize,
    /// Version check handling.
    pub version_check: VersionCheckStatus,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Applies upgrade plans through a migration runner.
#[derive(Clone)]
pub struct UpgradeExecutor {
    /// Every schema the product knows about.
    universe: SchemaUniverse,
    /// Service whose recorded version gates the upgrade.
    service: ServiceName,
    /// Destination for audit events.
    audit: Arc<dyn UpgradeAuditSink>,
    /// Cooperative cancellation flag.
    cancellation: CancellationToken,
}

impl UpgradeExecutor {
    /// Creates an executor over `universe` gated on `service`.
    #[must_use]
    pub fn new(universe: SchemaUniverse, service: ServiceName) -> Self {
        Self {
            universe,
            service,
            audit: Arc::new(NoopAuditSink),
            cancellation: CancellationToken::new(),
        }
    }

    /// Routes audit events to `sink`.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn UpgradeAuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Observes `token` between steps.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the schema universe handed to runners.
    #[must_use]
    pub const fn universe(&self) -> &SchemaUniverse {
        &self.universe
    }

    /// Returns the cancellation token observed between steps.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Pairs every schema in the universe with the plan's definitions.
    #[must_use]
    pub fn schemas_for(&self, plan: &UpgradePlan) -> Vec<Schema> {
        self.universe
            .slots()
            .iter()
            .map(|slot| Schema {
                name: slot.name.clone(),
                migrations_table: slot.migrations_table.clone(),
                definitions: plan.definitions_for(&slot.name),
            })
            .collect()
    }

    /// Runs `plan` to completion or to its first failure.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError`] for the first failing transition. Steps applied
    /// before the failure remain applied.
    pub fn run<F>(
        &self,
        factory: F,
        plan: &UpgradePlan,
        skip_version_check: bool,
    ) -> Result<UpgradeOutcome, UpgradeError>
    where
        F: RunnerFactory,
    {
        let audit = AuditContext::new(self.audit.as_ref(), plan);
        let result = self.execute(factory, plan, skip_version_check, &audit);
        match &result {
            Ok(_) => audit.record(UpgradeEventKind::UpgradeCompleted, None, Vec::new(), None),
            Err(err) => audit.record(
                UpgradeEventKind::UpgradeAborted,
                err.failed_step().and_then(|index| plan.steps.get(index).map(|s| (index, s))),
                Vec::new(),
                Some(err.to_string()),
            ),
        }
        result
    }

    /// Drives the state machine; audit bookends are handled by [`Self::run`].
    fn execute<F>(
        &self,
        factory: F,
        plan: &UpgradePlan,
        skip_version_check: bool,
        audit: &AuditContext<'_>,
    ) -> Result<UpgradeOutcome, UpgradeError>
    where
        F: RunnerFactory,
    {
        audit.record(UpgradeEventKind::UpgradeStarted, None, Vec::new(), None);
        let schemas = self.schemas_for(plan);
        let mut runner =
            factory.build(self.universe.names(), schemas).map_err(UpgradeError::RunnerConstruction)?;

        let version_check = if skip_version_check {
            audit.record(UpgradeEventKind::VersionCheckSkipped, None, Vec::new(), None);
            VersionCheckStatus::Skipped
        } else {
            if let Err(err) = check_version(&runner, &self.service, plan) {
                audit.record(
                    UpgradeEventKind::VersionCheckFailed,
                    None,
                    Vec::new(),
                    Some(err.to_string()),
                );
                return Err(UpgradeError::VersionCheck(err));
            }
            audit.record(UpgradeEventKind::VersionCheckPassed, None, Vec::new(), None);
            VersionCheckStatus::Verified
        };

        for (index, step) in plan.steps.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                return Err(UpgradeError::Cancelled {
                    completed_steps: index,
                });
            }
            if !step.out_of_band_migration_ids.is_empty() {
                return Err(UpgradeError::OutOfBandMigrationsUnsupported {
                    step: index,
                    version: step.version,
                    ids: step.out_of_band_migration_ids.clone(),
                });
            }

            let options = step_options(step);
            let touched = touched_schemas(&options);
            audit.record(UpgradeEventKind::StepStarted, Some((index, step)), touched.clone(), None);
            runner.run(&options).map_err(|source| UpgradeError::RunnerExecution {
                step: index,
                source,
            })?;
            audit.record(UpgradeEventKind::StepApplied, Some((index, step)), touched, None);
        }

        Ok(UpgradeOutcome {
            steps_applied: plan.steps.len(),
            version_check,
        })
    }
}

/// Builds the runner options for one step.
///
/// Operations follow the leaf mapping's key order, which is lexicographic by
/// schema name.
#[must_use]
pub fn step_options(step: &UpgradeStep) -> RunnerOptions {
    let operations = step
        .leaf_ids
        .iter()
        .map(|(schema, leaves)| MigrationOperation::targeted_up(schema.clone(), leaves.clone()))
        .collect();
    RunnerOptions {
        operations,
        privileged_mode: PrivilegedMode::Apply,
        privileged_hash: None,
        ignore_single_dirty_log: false,
    }
}

/// Lists the schemas an options batch touches, in dispatch order.
fn touched_schemas(options: &RunnerOptions) -> Vec<SchemaName> {
    options.operations.iter().map(|operation| operation.schema_name.clone()).collect()
}

// ============================================================================
// SECTION: Audit Context
// ============================================================================

/// Plan-scoped audit helper.
struct AuditContext<'a> {
    /// Destination sink.
    sink: &'a dyn UpgradeAuditSink,
    /// Plan fingerprint, when it could be computed.
    plan_hash: Option<String>,
    /// Plan starting version.
    from: Version,
    /// Plan target version.
    to: Version,
}

impl<'a> AuditContext<'a> {
    /// Captures plan metadata once per run.
    fn new(sink: &'a dyn UpgradeAuditSink, plan: &UpgradePlan) -> Self {
        Self {
            sink,
            plan_hash: plan.canonical_hash().ok().map(|digest| digest.to_string()),
            from: plan.from,
            to: plan.to,
        }
    }

    /// Emits one event.
    fn record(
        &self,
        kind: UpgradeEventKind,
        step: Option<(usize, &UpgradeStep)>,
        schemas: Vec<SchemaName>,
        error: Option<String>,
    ) {
        let event = UpgradeAuditEvent::new(UpgradeAuditEventParams {
            kind,
            plan_hash: self.plan_hash.clone(),
            from: self.from,
            to: self.to,
            step: step.map(|(index, _)| index),
            version: step.map(|(_, step)| step.version),
            schemas,
            error,
        });
        self.sink.record(&event);
    }
}
