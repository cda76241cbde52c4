// crates/upgrade-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Upgrade Gate Interfaces
// Description: Contract surfaces for migration runners and version stores.
// Purpose: Keep SQL mechanics, locking, and persistence outside the core.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The core never touches a database. A [`RunnerFactory`] builds a stateful
//! [`Runner`] bound to the full schema universe; the runner applies operation
//! batches and exposes a database handle that doubles as a [`VersionStore`]
//! for the pre-flight version gate. Implementations must fail closed: an
//! unreadable record is an error, never a default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::RunnerOptions;
use crate::core::Schema;
use crate::core::SchemaName;
use crate::core::ServiceName;

// ============================================================================
// SECTION: Version Store
// ============================================================================

/// Version store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionStoreError {
    /// The store could not be read.
    #[error("version store error: {0}")]
    Store(String),
}

/// Read access to the persisted installed-version records.
pub trait VersionStore {
    /// Returns the version string recorded by `service`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`VersionStoreError`] when the record cannot be read.
    fn service_version(&self, service: &ServiceName) -> Result<Option<String>, VersionStoreError>;
}

impl<T: VersionStore + ?Sized> VersionStore for &T {
    fn service_version(&self, service: &ServiceName) -> Result<Option<String>, VersionStoreError> {
        (**self).service_version(service)
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Migration runner errors. Messages are forwarded to callers verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    /// The runner could not be constructed.
    #[error("{0}")]
    Construction(String),
    /// An operation batch failed.
    #[error("{0}")]
    Execution(String),
    /// The runner's database handle is unavailable.
    #[error("{0}")]
    Database(String),
}

/// A stateful migration runner bound to a concrete schema definition set.
pub trait Runner {
    /// Database handle type used to read persisted versions.
    type Store: VersionStore;

    /// Returns a handle to the runner's database for version lookups.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the handle cannot be obtained.
    fn database_handle(&self) -> Result<Self::Store, RunnerError>;

    /// Applies one batch of operations.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when any operation fails.
    fn run(&mut self, options: &RunnerOptions) -> Result<(), RunnerError>;
}

/// Constructs a [`Runner`] over the full schema universe.
pub trait RunnerFactory {
    /// Runner produced by this factory.
    type Runner: Runner;

    /// Builds the runner.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when construction fails.
    fn build(
        self,
        schema_names: Vec<SchemaName>,
        schemas: Vec<Schema>,
    ) -> Result<Self::Runner, RunnerError>;
}

impl<F, R> RunnerFactory for F
where
    F: FnOnce(Vec<SchemaName>, Vec<Schema>) -> Result<R, RunnerError>,
    R: Runner,
{
    type Runner = R;

    fn build(self, schema_names: Vec<SchemaName>, schemas: Vec<Schema>) -> Result<R, RunnerError> {
        self(schema_names, schemas)
    }
}
