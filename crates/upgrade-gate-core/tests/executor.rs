// crates/upgrade-gate-core/tests/executor.rs
// ============================================================================
// Module: Upgrade Executor Tests
// Description: Tests for step dispatch, ordering, and failure handling.
// ============================================================================
//! ## Overview
//! Drives the executor with a recording runner and checks what reached the
//! runner, in which order, and what stopped the walk.

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

use std::collections::BTreeMap;

use upgrade_gate_core::CancellationToken;
use upgrade_gate_core::Definition;
use upgrade_gate_core::Definitions;
use upgrade_gate_core::InMemoryVersionStore;
use upgrade_gate_core::MigrationId;
use upgrade_gate_core::OperationKind;
use upgrade_gate_core::PrivilegedMode;
use upgrade_gate_core::RecordingRunner;
use upgrade_gate_core::Runner;
use upgrade_gate_core::RunnerError;
use upgrade_gate_core::RunnerJournal;
use upgrade_gate_core::RunnerOptions;
use upgrade_gate_core::Schema;
use upgrade_gate_core::SchemaName;
use upgrade_gate_core::SchemaUniverse;
use upgrade_gate_core::ServiceName;
use upgrade_gate_core::UpgradeError;
use upgrade_gate_core::UpgradeExecutor;
use upgrade_gate_core::UpgradePlan;
use upgrade_gate_core::UpgradeStep;
use upgrade_gate_core::Version;
use upgrade_gate_core::VersionCheckStatus;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn ids(raw: &[i64]) -> Vec<MigrationId> {
    raw.iter().copied().map(MigrationId::new).collect()
}

fn chain(raw: &[i64]) -> Definitions {
    let mut parent: Option<MigrationId> = None;
    let mut definitions = Vec::new();
    for id in raw {
        let id = MigrationId::new(*id);
        definitions.push(Definition {
            id,
            name: format!("migration_{id}"),
            parents: parent.into_iter().collect(),
            privileged: false,
        });
        parent = Some(id);
    }
    Definitions::new(definitions)
}

fn step(version: Version, leaves: &[(&str, &[i64])]) -> UpgradeStep {
    UpgradeStep {
        version,
        leaf_ids: leaves.iter().map(|(schema, raw)| (SchemaName::from(*schema), ids(raw))).collect(),
        out_of_band_migration_ids: Vec::new(),
    }
}

fn universe() -> SchemaUniverse {
    SchemaUniverse::from_names(["frontend", "codeintel", "codeinsights"]).unwrap()
}

/// Three steps from 5.0 to 5.3; codeinsights is only touched by the last one.
fn three_step_plan() -> UpgradePlan {
    let mut definitions = BTreeMap::new();
    definitions.insert(SchemaName::from("frontend"), chain(&[1, 2, 3]));
    definitions.insert(SchemaName::from("codeintel"), chain(&[10, 11]));
    definitions.insert(SchemaName::from("codeinsights"), chain(&[20]));
    UpgradePlan {
        from: Version::new(5, 0),
        to: Version::new(5, 3),
        definitions,
        steps: vec![
            step(Version::new(5, 1), &[("frontend", &[2]), ("codeintel", &[10])]),
            step(Version::new(5, 2), &[("frontend", &[3])]),
            step(Version::new(5, 3), &[("codeintel", &[11]), ("codeinsights", &[20])]),
        ],
    }
}

fn executor() -> UpgradeExecutor {
    UpgradeExecutor::new(universe(), ServiceName::default())
}

fn store() -> InMemoryVersionStore {
    InMemoryVersionStore::with_version("frontend", "5.0.4")
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Tests every step reaches the runner once, in plan order.
#[test]
fn test_run_dispatches_each_step_in_order() {
    let journal = RunnerJournal::new();
    let runner = RecordingRunner::new(store(), journal.clone());
    let outcome = executor().run(runner.into_factory(), &three_step_plan(), false).unwrap();

    assert_eq!(outcome.steps_applied, 3);
    assert_eq!(outcome.version_check, VersionCheckStatus::Verified);
    let calls = journal.calls();
    assert_eq!(calls.len(), 3);
    let targets: Vec<Vec<(String, Vec<MigrationId>)>> = calls
        .iter()
        .map(|options| {
            options
                .operations
                .iter()
                .map(|op| (op.schema_name.to_string(), op.target_versions.clone()))
                .collect()
        })
        .collect();
    assert_eq!(
        targets,
        vec![
            vec![("codeintel".to_string(), ids(&[10])), ("frontend".to_string(), ids(&[2]))],
            vec![("frontend".to_string(), ids(&[3]))],
            vec![("codeinsights".to_string(), ids(&[20])), ("codeintel".to_string(), ids(&[11]))],
        ]
    );
}

/// Tests every batch uses targeted-up operations with fixed privileged settings.
#[test]
fn test_run_uses_fixed_runner_options() {
    let journal = RunnerJournal::new();
    let runner = RecordingRunner::new(store(), journal.clone());
    executor().run(runner.into_factory(), &three_step_plan(), false).unwrap();

    for options in journal.calls() {
        assert_eq!(options.privileged_mode, PrivilegedMode::Apply);
        assert_eq!(options.privileged_hash, None);
        assert!(!options.ignore_single_dirty_log);
        assert!(options.operations.iter().all(|op| op.kind == OperationKind::TargetedUp));
    }
}

/// Tests the factory sees the whole universe with per-schema definitions.
#[test]
fn test_run_builds_runner_over_full_universe() {
    let journal = RunnerJournal::new();
    let runner = RecordingRunner::new(store(), journal.clone());
    let mut plan = three_step_plan();
    plan.definitions.remove(&SchemaName::from("codeinsights"));
    plan.steps.truncate(2);
    plan.to = Version::new(5, 2);
    executor().run(runner.into_factory(), &plan, false).unwrap();

    let (names, schemas) = journal.constructed().unwrap();
    assert_eq!(names, universe().names());
    assert_eq!(schemas.len(), 3);
    assert_eq!(schemas[0].migrations_table, "schema_migrations");
    assert_eq!(schemas[1].migrations_table, "codeintel_schema_migrations");
    assert_eq!(schemas[0].definitions.all().len(), 3);
    assert!(schemas[2].definitions.is_empty());
}

/// Tests an empty plan succeeds without touching the runner.
#[test]
fn test_run_empty_plan_is_noop() {
    let journal = RunnerJournal::new();
    let runner = RecordingRunner::new(store(), journal.clone());
    let plan = UpgradePlan {
        from: Version::new(5, 0),
        to: Version::new(5, 0),
        definitions: BTreeMap::new(),
        steps: Vec::new(),
    };
    let outcome = executor().run(runner.into_factory(), &plan, false).unwrap();
    assert_eq!(outcome.steps_applied, 0);
    assert!(journal.calls().is_empty());
}

/// Tests a step with no leaves still reaches the runner with no operations.
#[test]
fn test_run_forwards_empty_step() {
    let journal = RunnerJournal::new();
    let runner = RecordingRunner::new(store(), journal.clone());
    let plan = UpgradePlan {
        from: Version::new(5, 0),
        to: Version::new(5, 1),
        definitions: BTreeMap::new(),
        steps: vec![step(Version::new(5, 1), &[])],
    };
    executor().run(runner.into_factory(), &plan, false).unwrap();
    let calls = journal.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].operations.is_empty());
}

/// Tests re-running an applied plan dispatches again.
#[test]
fn test_rerun_is_not_guarded() {
    let journal = RunnerJournal::new();
    let plan = three_step_plan();
    let executor = executor();
    executor.run(RecordingRunner::new(store(), journal.clone()).into_factory(), &plan, true).unwrap();
    executor.run(RecordingRunner::new(store(), journal.clone()).into_factory(), &plan, true).unwrap();
    assert_eq!(journal.calls().len(), 6);
}

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Tests out-of-band migrations abort before their step is dispatched.
#[test]
fn test_out_of_band_step_aborts_before_dispatch() {
    let journal = RunnerJournal::new();
    let runner = RecordingRunner::new(store(), journal.clone());
    let mut plan = three_step_plan();
    plan.steps[1].out_of_band_migration_ids = ids(&[42, 43]);

    let err = executor().run(runner.into_factory(), &plan, false).unwrap_err();
    assert_eq!(
        err,
        UpgradeError::OutOfBandMigrationsUnsupported {
            step: 1,
            version: Version::new(5, 2),
            ids: ids(&[42, 43]),
        }
    );
    assert!(err.to_string().starts_with("unimplemented"));
    assert!(err.to_string().contains("[42 43]"));
    assert_eq!(journal.calls().len(), 1);
    assert_eq!(err.failed_step(), Some(1));
}

/// Tests runner errors surface verbatim and stop later steps.
#[test]
fn test_runner_failure_stops_walk() {
    let journal = RunnerJournal::new();
    let runner = RecordingRunner::new(store(), journal.clone())
        .failing_on(1, "relation \"repo\" already exists");

    let err = executor().run(runner.into_factory(), &three_step_plan(), false).unwrap_err();
    assert_eq!(err.to_string(), "relation \"repo\" already exists");
    assert_eq!(
        err,
        UpgradeError::RunnerExecution {
            step: 1,
            source: RunnerError::Execution("relation \"repo\" already exists".to_string()),
        }
    );
    assert_eq!(journal.calls().len(), 2);
}

/// Tests factory failures abort before any version check.
#[test]
fn test_factory_failure_aborts() {
    let store = store();
    let factory = |_names: Vec<SchemaName>,
                   _schemas: Vec<Schema>|
     -> Result<RecordingRunner, RunnerError> {
        Err(RunnerError::Construction("no schemas registered".to_string()))
    };
    let err = executor().run(factory, &three_step_plan(), false).unwrap_err();
    assert_eq!(
        err,
        UpgradeError::RunnerConstruction(RunnerError::Construction(
            "no schemas registered".to_string()
        ))
    );
    assert_eq!(err.to_string(), "failed to construct migration runner: no schemas registered");
    assert_eq!(store.reads(), 0);
}

/// Tests cancellation is observed before the next step.
#[test]
fn test_cancellation_before_first_step() {
    let journal = RunnerJournal::new();
    let runner = RecordingRunner::new(store(), journal.clone());
    let token = CancellationToken::new();
    token.cancel();
    let executor = executor().with_cancellation(token);

    let err = executor.run(runner.into_factory(), &three_step_plan(), false).unwrap_err();
    assert_eq!(
        err,
        UpgradeError::Cancelled {
            completed_steps: 0,
        }
    );
    assert!(journal.calls().is_empty());
}

/// Tests cancellation requested mid-run leaves completed steps applied.
#[test]
fn test_cancellation_between_steps() {
    struct CancelAfterFirst {
        inner: RecordingRunner,
        token: CancellationToken,
    }

    impl Runner for CancelAfterFirst {
        type Store = InMemoryVersionStore;

        fn database_handle(&self) -> Result<Self::Store, RunnerError> {
            self.inner.database_handle()
        }

        fn run(&mut self, options: &RunnerOptions) -> Result<(), RunnerError> {
            self.inner.run(options)?;
            self.token.cancel();
            Ok(())
        }
    }

    let journal = RunnerJournal::new();
    let token = CancellationToken::new();
    let runner = CancelAfterFirst {
        inner: RecordingRunner::new(store(), journal.clone()),
        token: token.clone(),
    };
    let executor = executor().with_cancellation(token);
    let factory = move |_names: Vec<SchemaName>,
                        _schemas: Vec<Schema>|
     -> Result<CancelAfterFirst, RunnerError> { Ok(runner) };

    let err = executor.run(factory, &three_step_plan(), false).unwrap_err();
    assert_eq!(
        err,
        UpgradeError::Cancelled {
            completed_steps: 1,
        }
    );
    assert_eq!(journal.calls().len(), 1);
}
