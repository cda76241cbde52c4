// crates/upgrade-gate-core/src/core/schema.rs
// ============================================================================
// Module: Upgrade Gate Schemas
// Description: Migration definitions, schema descriptors, and the schema universe.
// Purpose: Describe every schema the runner must reason about during an upgrade.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`Schema`] pairs a schema name and its migrations-tracking table with a
//! read-only view of the migration definition graph supplied by the upstream
//! registry. [`SchemaUniverse`] is the injected, immutable list of every schema
//! the product knows about; the executor hands the whole universe to the runner
//! even when a plan touches only a subset.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

use crate::core::identifiers::MigrationId;
use crate::core::identifiers::SchemaName;

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// A single migration in a schema's definition graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    /// Migration identifier.
    pub id: MigrationId,
    /// Human-readable migration name.
    pub name: String,
    /// Migrations that must be applied before this one.
    #[serde(default)]
    pub parents: Vec<MigrationId>,
    /// Whether the migration requires elevated permissions.
    #[serde(default)]
    pub privileged: bool,
}

/// Shared, read-only migration definitions for one schema.
///
/// # Invariants
/// - Cloning shares the underlying storage; the collection is never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definitions(Arc<[Definition]>);

impl Definitions {
    /// Wraps a list of definitions.
    #[must_use]
    pub fn new(definitions: Vec<Definition>) -> Self {
        Self(definitions.into())
    }

    /// Returns an empty definition set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns all definitions in registry order.
    #[must_use]
    pub fn all(&self) -> &[Definition] {
        &self.0
    }

    /// Returns true when no definitions are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up a definition by identifier.
    #[must_use]
    pub fn get(&self, id: MigrationId) -> Option<&Definition> {
        self.0.iter().find(|definition| definition.id == id)
    }

    /// Returns the given migrations plus every transitive parent.
    ///
    /// Unknown identifiers are included as-is and contribute no parents.
    #[must_use]
    pub fn ancestors_inclusive(&self, ids: &[MigrationId]) -> BTreeSet<MigrationId> {
        let mut seen = BTreeSet::new();
        let mut frontier: Vec<MigrationId> = ids.to_vec();
        while let Some(id) = frontier.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(definition) = self.get(id) {
                frontier.extend(definition.parents.iter().copied());
            }
        }
        seen
    }
}

impl Serialize for Definitions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Definitions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Definition>::deserialize(deserializer).map(Self::new)
    }
}

// ============================================================================
// SECTION: Schema
// ============================================================================

/// A named schema bound to its tracking table and definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Schema name.
    pub name: SchemaName,
    /// Table recording applied migrations for this schema.
    pub migrations_table: String,
    /// Definitions supplied by the plan for this schema (possibly empty).
    pub definitions: Definitions,
}

/// Returns the conventional migrations-tracking table for a schema name.
///
/// The `frontend` schema predates the per-schema naming scheme and keeps the
/// bare `schema_migrations` table.
#[must_use]
pub fn default_migrations_table(name: &SchemaName) -> String {
    if name.as_str() == "frontend" {
        "schema_migrations".to_string()
    } else {
        format!("{name}_schema_migrations")
    }
}

// ============================================================================
// SECTION: Schema Universe
// ============================================================================

/// One entry of the schema universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSlot {
    /// Schema name.
    pub name: SchemaName,
    /// Migrations-tracking table name.
    pub migrations_table: String,
}

impl SchemaSlot {
    /// Creates a slot using the conventional table name.
    #[must_use]
    pub fn conventional(name: impl Into<SchemaName>) -> Self {
        let name = name.into();
        let migrations_table = default_migrations_table(&name);
        Self {
            name,
            migrations_table,
        }
    }
}

/// Errors raised when building a schema universe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaUniverseError {
    /// The universe has no schemas.
    #[error("schema universe must contain at least one schema")]
    Empty,
    /// A schema name is blank.
    #[error("schema names must be non-empty")]
    BlankName,
    /// A migrations table name is blank.
    #[error("schema {0} has an empty migrations table name")]
    BlankTable(SchemaName),
    /// The same schema name appears twice.
    #[error("duplicate schema name: {0}")]
    Duplicate(SchemaName),
}

/// The complete, immutable set of schemas known to the product.
///
/// # Invariants
/// - Non-empty; names are non-blank and unique; order is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaUniverse {
    /// Schema slots in declaration order.
    slots: Arc<[SchemaSlot]>,
}

impl SchemaUniverse {
    /// Builds a universe from explicit slots.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaUniverseError`] when the slots are empty, blank, or duplicated.
    pub fn new(slots: Vec<SchemaSlot>) -> Result<Self, SchemaUniverseError> {
        if slots.is_empty() {
            return Err(SchemaUniverseError::Empty);
        }
        let mut seen = BTreeSet::new();
        for slot in &slots {
            if slot.name.as_str().trim().is_empty() {
                return Err(SchemaUniverseError::BlankName);
            }
            if slot.migrations_table.trim().is_empty() {
                return Err(SchemaUniverseError::BlankTable(slot.name.clone()));
            }
            if !seen.insert(slot.name.clone()) {
                return Err(SchemaUniverseError::Duplicate(slot.name.clone()));
            }
        }
        Ok(Self {
            slots: slots.into(),
        })
    }

    /// Builds a universe from names using conventional table names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaUniverseError`] when the names are empty, blank, or duplicated.
    pub fn from_names<I, N>(names: I) -> Result<Self, SchemaUniverseError>
    where
        I: IntoIterator<Item = N>,
        N: Into<SchemaName>,
    {
        Self::new(names.into_iter().map(SchemaSlot::conventional).collect())
    }

    /// Returns the schema slots in declaration order.
    #[must_use]
    pub fn slots(&self) -> &[SchemaSlot] {
        &self.slots
    }

    /// Returns the schema names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<SchemaName> {
        self.slots.iter().map(|slot| slot.name.clone()).collect()
    }

    /// Returns true when the universe contains `name`.
    #[must_use]
    pub fn contains(&self, name: &SchemaName) -> bool {
        self.slots.iter().any(|slot| &slot.name == name)
    }
}
