// crates/upgrade-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Upgrade Gate Identifiers
// Description: Canonical opaque identifiers for schemas, services, and migrations.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize transparently. Schema and service names
//! are strings; migration identifiers are signed integers assigned by the
//! schema-definition registry. Validation happens at the universe and config
//! boundaries rather than inside these wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Schema Names
// ============================================================================

/// Name of a logical schema (for example `frontend` or `codeintel`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaName(String);

impl SchemaName {
    /// Creates a new schema name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SchemaName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SchemaName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Service Names
// ============================================================================

/// Service whose persisted version gates the upgrade.
pub const DEFAULT_SERVICE_NAME: &str = "frontend";

/// Name of a service that records its installed product version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    /// Creates a new service name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ServiceName {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ServiceName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ServiceName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Migration Identifiers
// ============================================================================

/// Identifier of a single migration within a schema's definition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationId(i64);

impl MigrationId {
    /// Creates a migration identifier from its raw value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for MigrationId {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

/// Formats migration identifiers as a bracketed, space-separated list.
#[must_use]
pub fn format_migration_ids(ids: &[MigrationId]) -> String {
    let joined = ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
    format!("[{joined}]")
}
