// crates/upgrade-gate-cli/src/state.rs
// ============================================================================
// Module: File-Backed Upgrade State
// Description: JSON state document standing in for a migrated database.
// Purpose: Let operators rehearse upgrade plans without database access.
// Dependencies: upgrade-gate-core, serde, serde_json, tempfile, thiserror
// ============================================================================

//! ## Overview
//! The state document records the installed version per service and, per
//! schema, which migrations are applied and which are dirty. The
//! [`FileStateRunner`] applies runner option batches to it with the same
//! contract a database-backed runner honors:
//!
//! - A batch is all-or-nothing: it is applied to a working copy and persisted
//!   atomically only when every operation succeeds.
//! - Dirty migrations block the batch unless the caller tolerates exactly one.
//! - Privileged migrations obey [`PrivilegedMode`].
//! - Only targeted-up operations are supported; other kinds are rejected.
//!
//! The document never records the installed version after an upgrade; that
//! record belongs to the service itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use upgrade_gate_core::Definitions;
use upgrade_gate_core::MigrationId;
use upgrade_gate_core::MigrationOperation;
use upgrade_gate_core::OperationKind;
use upgrade_gate_core::PrivilegedMode;
use upgrade_gate_core::Runner;
use upgrade_gate_core::RunnerError;
use upgrade_gate_core::RunnerOptions;
use upgrade_gate_core::Schema;
use upgrade_gate_core::SchemaName;
use upgrade_gate_core::ServiceName;
use upgrade_gate_core::VersionStore;
use upgrade_gate_core::VersionStoreError;
use upgrade_gate_core::format_migration_ids;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a state document.
pub const MAX_STATE_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Document
// ============================================================================

/// Persisted upgrade state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    /// Installed version string per service.
    #[serde(default)]
    pub service_versions: BTreeMap<ServiceName, String>,
    /// Migration log per schema.
    #[serde(default)]
    pub schemas: BTreeMap<SchemaName, SchemaState>,
}

/// Migration log for one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaState {
    /// Migrations recorded as applied.
    #[serde(default)]
    pub applied: BTreeSet<MigrationId>,
    /// Migrations whose last attempt failed part-way.
    #[serde(default)]
    pub dirty: BTreeSet<MigrationId>,
    /// Privileged migrations recorded as applied without being run.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub recorded_only: BTreeSet<MigrationId>,
}

impl StateDocument {
    /// Reads a state document with a size limit.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the file is unreadable, oversized, or malformed.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let file = File::open(path).map_err(|err| StateError::Io {
            path: path.display().to_string(),
            error: err.to_string(),
        })?;
        let limit = u64::try_from(MAX_STATE_BYTES).unwrap_or(u64::MAX);
        let mut bytes = Vec::new();
        file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(|err| {
            StateError::Io {
                path: path.display().to_string(),
                error: err.to_string(),
            }
        })?;
        if bytes.len() > MAX_STATE_BYTES {
            return Err(StateError::TooLarge {
                path: path.display().to_string(),
                limit: MAX_STATE_BYTES,
            });
        }
        serde_json::from_slice(&bytes).map_err(|err| StateError::Parse {
            path: path.display().to_string(),
            error: err.to_string(),
        })
    }

    /// Writes the document next to `path` and renames it into place.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Persist`] when the write or rename fails.
    pub fn persist(&self, path: &Path) -> Result<(), StateError> {
        let persist_error = |error: String| StateError::Persist {
            path: path.display().to_string(),
            error,
        };
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut bytes =
            serde_json::to_vec_pretty(self).map_err(|err| persist_error(err.to_string()))?;
        bytes.push(b'\n');
        let mut temp =
            NamedTempFile::new_in(parent).map_err(|err| persist_error(err.to_string()))?;
        temp.write_all(&bytes).map_err(|err| persist_error(err.to_string()))?;
        temp.as_file().sync_all().map_err(|err| persist_error(err.to_string()))?;
        temp.persist(path).map_err(|err| persist_error(err.error.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures reading, applying, or persisting upgrade state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The state file could not be read.
    #[error("failed to read state file {path}: {error}")]
    Io {
        /// State file path.
        path: String,
        /// Underlying error.
        error: String,
    },
    /// The state file exceeds the size limit.
    #[error("state file {path} exceeds {limit} bytes")]
    TooLarge {
        /// State file path.
        path: String,
        /// Size limit in bytes.
        limit: usize,
    },
    /// The state file is not a valid document.
    #[error("failed to parse state file {path}: {error}")]
    Parse {
        /// State file path.
        path: String,
        /// Underlying error.
        error: String,
    },
    /// The state file could not be written.
    #[error("failed to persist state file {path}: {error}")]
    Persist {
        /// State file path.
        path: String,
        /// Underlying error.
        error: String,
    },
    /// A schema name has no registered schema.
    #[error("unknown schema {0}")]
    UnknownSchema(SchemaName),
    /// Operation targets are not defined for the schema.
    #[error("unknown migrations {} in schema {schema}", format_migration_ids(.ids))]
    UnknownMigrations {
        /// Schema name.
        schema: SchemaName,
        /// Unknown targets.
        ids: Vec<MigrationId>,
    },
    /// The schema has dirty migrations.
    #[error("schema {schema} has dirty migrations {}", format_migration_ids(.ids))]
    Dirty {
        /// Schema name.
        schema: SchemaName,
        /// Dirty migrations.
        ids: Vec<MigrationId>,
    },
    /// Pending privileged migrations were refused.
    #[error(
        "refusing to apply privileged migrations {} in schema {schema}",
        format_migration_ids(.ids)
    )]
    PrivilegedRefused {
        /// Schema name.
        schema: SchemaName,
        /// Privileged migrations that would have run.
        ids: Vec<MigrationId>,
    },
    /// The runner only applies migrations forward to target leaves.
    #[error("unsupported {kind} operation for schema {schema}")]
    UnsupportedOperation {
        /// Schema name.
        schema: SchemaName,
        /// Rejected operation kind.
        kind: OperationKind,
    },
}

// ============================================================================
// SECTION: Version Store
// ============================================================================

/// Read-only snapshot of the recorded service versions.
#[derive(Debug, Clone, Default)]
pub struct StateVersionStore {
    /// Version string per service.
    versions: BTreeMap<ServiceName, String>,
}

impl VersionStore for StateVersionStore {
    fn service_version(&self, service: &ServiceName) -> Result<Option<String>, VersionStoreError> {
        Ok(self.versions.get(service).cloned())
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Migration runner over a JSON state file.
#[derive(Debug)]
pub struct FileStateRunner {
    /// State file path.
    path: PathBuf,
    /// Registered schemas by name.
    schemas: BTreeMap<SchemaName, Schema>,
    /// Last persisted document.
    document: StateDocument,
}

impl FileStateRunner {
    /// Opens the state file for the given schema universe.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the file cannot be loaded or a schema name
    /// has no matching schema.
    pub fn open(
        path: &Path,
        schema_names: Vec<SchemaName>,
        schemas: Vec<Schema>,
    ) -> Result<Self, StateError> {
        let mut registered: BTreeMap<SchemaName, Schema> =
            schemas.into_iter().map(|schema| (schema.name.clone(), schema)).collect();
        registered.retain(|name, _| schema_names.contains(name));
        if let Some(missing) = schema_names.iter().find(|name| !registered.contains_key(*name)) {
            return Err(StateError::UnknownSchema(missing.clone()));
        }
        let document = StateDocument::load(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            schemas: registered,
            document,
        })
    }

    /// Returns the last persisted document.
    #[must_use]
    pub const fn document(&self) -> &StateDocument {
        &self.document
    }

    /// Applies one batch and persists it.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when any operation is rejected; the persisted
    /// document is then left unchanged.
    pub fn apply(&mut self, options: &RunnerOptions) -> Result<(), StateError> {
        let mut working = self.document.clone();
        for operation in &options.operations {
            let schema = self
                .schemas
                .get(&operation.schema_name)
                .ok_or_else(|| StateError::UnknownSchema(operation.schema_name.clone()))?;
            let state = working.schemas.entry(operation.schema_name.clone()).or_default();
            check_dirty(&operation.schema_name, state, options.ignore_single_dirty_log)?;
            apply_operation(operation, &schema.definitions, state, options.privileged_mode)?;
        }
        working.persist(&self.path)?;
        self.document = working;
        Ok(())
    }
}

impl Runner for FileStateRunner {
    type Store = StateVersionStore;

    fn database_handle(&self) -> Result<Self::Store, RunnerError> {
        Ok(StateVersionStore {
            versions: self.document.service_versions.clone(),
        })
    }

    fn run(&mut self, options: &RunnerOptions) -> Result<(), RunnerError> {
        self.apply(options).map_err(|err| RunnerError::Execution(err.to_string()))
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Rejects schemas with dirty migrations unless exactly one is tolerated.
fn check_dirty(
    schema: &SchemaName,
    state: &SchemaState,
    ignore_single_dirty_log: bool,
) -> Result<(), StateError> {
    if state.dirty.is_empty() || (ignore_single_dirty_log && state.dirty.len() == 1) {
        return Ok(());
    }
    Err(StateError::Dirty {
        schema: schema.clone(),
        ids: state.dirty.iter().copied().collect(),
    })
}

/// Applies one operation to a schema's working state.
fn apply_operation(
    operation: &MigrationOperation,
    definitions: &Definitions,
    state: &mut SchemaState,
    privileged_mode: PrivilegedMode,
) -> Result<(), StateError> {
    let schema = &operation.schema_name;
    if operation.kind != OperationKind::TargetedUp {
        return Err(StateError::UnsupportedOperation {
            schema: schema.clone(),
            kind: operation.kind,
        });
    }
    let unknown: Vec<MigrationId> = operation
        .target_versions
        .iter()
        .copied()
        .filter(|id| definitions.get(*id).is_none())
        .collect();
    if !unknown.is_empty() {
        return Err(StateError::UnknownMigrations {
            schema: schema.clone(),
            ids: unknown,
        });
    }

    mark_applied(schema, definitions, state, &operation.target_versions, privileged_mode)
}

/// Marks `targets` and every ancestor applied, honoring the privileged mode.
fn mark_applied(
    schema: &SchemaName,
    definitions: &Definitions,
    state: &mut SchemaState,
    targets: &[MigrationId],
    privileged_mode: PrivilegedMode,
) -> Result<(), StateError> {
    let pending: Vec<MigrationId> = definitions
        .ancestors_inclusive(targets)
        .into_iter()
        .filter(|id| !state.applied.contains(id))
        .collect();
    let privileged: Vec<MigrationId> = pending
        .iter()
        .copied()
        .filter(|id| definitions.get(*id).is_some_and(|definition| definition.privileged))
        .collect();

    match privileged_mode {
        PrivilegedMode::Refuse if !privileged.is_empty() => {
            return Err(StateError::PrivilegedRefused {
                schema: schema.clone(),
                ids: privileged,
            });
        }
        PrivilegedMode::Noop => state.recorded_only.extend(privileged.iter().copied()),
        PrivilegedMode::Apply | PrivilegedMode::Refuse => {}
    }
    for id in pending {
        state.dirty.remove(&id);
        state.applied.insert(id);
    }
    Ok(())
}
