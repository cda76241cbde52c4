// crates/upgrade-gate-core/src/runtime/memory.rs
// ============================================================================
// Module: Upgrade Gate In-Memory Doubles
// Description: In-memory version store and recording runner.
// Purpose: Exercise the gate and executor deterministically without a database.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! These implementations back tests and local demos. The recording runner
//! journals every batch it receives and can be scripted to fail on a given
//! call; the version store counts reads so callers can prove it was never
//! consulted. Neither is intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::core::RunnerOptions;
use crate::core::Schema;
use crate::core::SchemaName;
use crate::core::ServiceName;
use crate::interfaces::Runner;
use crate::interfaces::RunnerError;
use crate::interfaces::VersionStore;
use crate::interfaces::VersionStoreError;

// ============================================================================
// SECTION: In-Memory Version Store
// ============================================================================

/// In-memory installed-version records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVersionStore {
    /// Version strings keyed by service.
    versions: Arc<Mutex<BTreeMap<ServiceName, String>>>,
    /// Number of lookups served.
    reads: Arc<AtomicUsize>,
}

impl InMemoryVersionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with one recorded version.
    #[must_use]
    pub fn with_version(service: impl Into<ServiceName>, version: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_version(service, version);
        store
    }

    /// Records `version` for `service`, replacing any previous value.
    pub fn set_version(&self, service: impl Into<ServiceName>, version: impl Into<String>) {
        if let Ok(mut versions) = self.versions.lock() {
            versions.insert(service.into(), version.into());
        }
    }

    /// Returns how many lookups this store (or any clone) has served.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl VersionStore for InMemoryVersionStore {
    fn service_version(&self, service: &ServiceName) -> Result<Option<String>, VersionStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let versions = self
            .versions
            .lock()
            .map_err(|_| VersionStoreError::Store("version store mutex poisoned".to_string()))?;
        Ok(versions.get(service).cloned())
    }
}

// ============================================================================
// SECTION: Recording Runner
// ============================================================================

/// Shared record of what a [`RecordingRunner`] saw.
#[derive(Debug, Clone, Default)]
pub struct RunnerJournal {
    /// Schema names and schemas passed to the factory.
    constructed: Arc<Mutex<Option<(Vec<SchemaName>, Vec<Schema>)>>>,
    /// Every options batch received, including failed ones.
    calls: Arc<Mutex<Vec<RunnerOptions>>>,
    /// Number of database handles handed out.
    handles: Arc<AtomicUsize>,
}

impl RunnerJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the factory inputs, if the runner was constructed.
    #[must_use]
    pub fn constructed(&self) -> Option<(Vec<SchemaName>, Vec<Schema>)> {
        self.constructed.lock().ok().and_then(|guard| guard.clone())
    }

    /// Returns every batch received, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<RunnerOptions> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Returns how many database handles were requested.
    #[must_use]
    pub fn handles(&self) -> usize {
        self.handles.load(Ordering::SeqCst)
    }
}

/// Runner that records batches instead of applying them.
#[derive(Debug, Clone)]
pub struct RecordingRunner {
    /// Version store exposed as the database handle.
    store: InMemoryVersionStore,
    /// Shared journal.
    journal: RunnerJournal,
    /// Zero-based call index that fails, with its message.
    fail_on_call: Option<(usize, String)>,
    /// Error returned instead of a database handle.
    handle_error: Option<String>,
}

impl RecordingRunner {
    /// Creates a runner that succeeds on every call.
    #[must_use]
    pub fn new(store: InMemoryVersionStore, journal: RunnerJournal) -> Self {
        Self {
            store,
            journal,
            fail_on_call: None,
            handle_error: None,
        }
    }

    /// Fails the call at `index` (zero-based) with `message`.
    #[must_use]
    pub fn failing_on(mut self, index: usize, message: impl Into<String>) -> Self {
        self.fail_on_call = Some((index, message.into()));
        self
    }

    /// Refuses to hand out a database handle.
    #[must_use]
    pub fn without_database(mut self, message: impl Into<String>) -> Self {
        self.handle_error = Some(message.into());
        self
    }

    /// Returns a factory that journals its inputs and yields this runner.
    pub fn into_factory(
        self,
    ) -> impl FnOnce(Vec<SchemaName>, Vec<Schema>) -> Result<Self, RunnerError> {
        move |names, schemas| {
            if let Ok(mut constructed) = self.journal.constructed.lock() {
                *constructed = Some((names, schemas));
            }
            Ok(self)
        }
    }
}

impl Runner for RecordingRunner {
    type Store = InMemoryVersionStore;

    fn database_handle(&self) -> Result<Self::Store, RunnerError> {
        self.journal.handles.fetch_add(1, Ordering::SeqCst);
        match &self.handle_error {
            Some(message) => Err(RunnerError::Database(message.clone())),
            None => Ok(self.store.clone()),
        }
    }

    fn run(&mut self, options: &RunnerOptions) -> Result<(), RunnerError> {
        let index = {
            let mut calls = self
                .journal
                .calls
                .lock()
                .map_err(|_| RunnerError::Execution("runner journal mutex poisoned".to_string()))?;
            calls.push(options.clone());
            calls.len() - 1
        };
        match &self.fail_on_call {
            Some((fail_index, message)) if *fail_index == index => {
                Err(RunnerError::Execution(message.clone()))
            }
            _ => Ok(()),
        }
    }
}
