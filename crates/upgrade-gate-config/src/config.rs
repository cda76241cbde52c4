// crates/upgrade-gate-config/src/config.rs
// ============================================================================
// Module: Upgrade Gate Configuration
// Description: Configuration loading and validation for Upgrade Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: upgrade-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! An explicitly named file must exist; when no path is named and the default
//! file is absent, [`UpgradeGateConfig::load_or_default`] falls back to the
//! built-in defaults. Invalid content always fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use upgrade_gate_core::DEFAULT_SERVICE_NAME;
use upgrade_gate_core::SchemaName;
use upgrade_gate_core::SchemaSlot;
use upgrade_gate_core::SchemaUniverse;
use upgrade_gate_core::ServiceName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "upgrade-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "UPGRADE_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Default maximum plan document size in bytes.
pub const DEFAULT_MAX_PLAN_BYTES: usize = 8 * 1024 * 1024;
/// Hard ceiling for the configurable plan size limit.
pub const MAX_PLAN_BYTES_CEILING: usize = 64 * 1024 * 1024;
/// Schemas known to the product when none are configured.
pub const DEFAULT_SCHEMA_NAMES: [&str; 3] = ["frontend", "codeintel", "codeinsights"];
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of configured schemas.
const MAX_SCHEMAS: usize = 64;
/// Maximum length of schema, table, and service identifiers.
const MAX_IDENTIFIER_LENGTH: usize = 63;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Top-level Upgrade Gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeGateConfig {
    /// Service whose recorded version gates upgrades.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Schemas known to the product, in declaration order.
    #[serde(default = "default_schemas")]
    pub schemas: Vec<SchemaConfig>,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Input size limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for UpgradeGateConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            schemas: default_schemas(),
            audit: AuditConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl UpgradeGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails, including
    /// when the resolved file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, _) = resolve_path(path)?;
        Self::load_resolved(&resolved)
    }

    /// Loads configuration, falling back to defaults when the implicit
    /// default file is absent.
    ///
    /// A path named on the command line or through [`CONFIG_ENV_VAR`] must
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, source) = resolve_path(path)?;
        if source == ConfigSource::Default && !resolved.exists() {
            return Ok(Self::default());
        }
        Self::load_resolved(&resolved)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates one resolved file.
    fn load_resolved(resolved: &Path) -> Result<Self, ConfigError> {
        validate_path(resolved)?;
        let bytes = fs::read(resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        if self.schemas.is_empty() {
            return Err(ConfigError::Invalid("schemas must not be empty".to_string()));
        }
        if self.schemas.len() > MAX_SCHEMAS {
            return Err(ConfigError::Invalid(format!(
                "schemas exceeds max entries ({MAX_SCHEMAS})"
            )));
        }
        let mut names = BTreeSet::new();
        let mut tables = BTreeSet::new();
        for schema in &self.schemas {
            schema.validate()?;
            if !names.insert(schema.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate schema name: {}",
                    schema.name
                )));
            }
            if !tables.insert(schema.migrations_table()) {
                return Err(ConfigError::Invalid(format!(
                    "schema {} reuses migrations table {}",
                    schema.name,
                    schema.migrations_table()
                )));
            }
        }
        self.audit.validate()?;
        self.limits.validate()
    }

    /// Returns the service whose recorded version gates upgrades.
    #[must_use]
    pub fn service_name(&self) -> ServiceName {
        ServiceName::new(self.service.name.trim())
    }

    /// Builds the schema universe handed to migration runners.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the schema list is not a valid universe.
    pub fn universe(&self) -> Result<SchemaUniverse, ConfigError> {
        SchemaUniverse::new(self.schemas.iter().map(SchemaConfig::slot).collect())
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name used for the installed-version lookup.
    #[serde(default = "default_service_name")]
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

impl ServiceConfig {
    /// Validates service configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("service.name", &self.name)
    }
}

/// One schema entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema name.
    pub name: String,
    /// Optional tracking table override.
    #[serde(default)]
    pub migrations_table: Option<String>,
}

impl SchemaConfig {
    /// Creates an entry using the conventional table name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            migrations_table: None,
        }
    }

    /// Returns the effective tracking table name.
    #[must_use]
    pub fn migrations_table(&self) -> String {
        self.migrations_table.as_ref().map_or_else(
            || upgrade_gate_core::default_migrations_table(&SchemaName::new(self.name.trim())),
            |table| table.trim().to_string(),
        )
    }

    /// Converts the entry into a universe slot.
    fn slot(&self) -> SchemaSlot {
        SchemaSlot {
            name: SchemaName::new(self.name.trim()),
            migrations_table: self.migrations_table(),
        }
    }

    /// Validates the schema entry.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("schemas.name", &self.name)?;
        if let Some(table) = &self.migrations_table {
            validate_identifier(&format!("schemas.{}.migrations_table", self.name), table)?;
        }
        Ok(())
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default)]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when absent.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

/// Input size limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum plan document size in bytes.
    #[serde(default = "default_max_plan_bytes")]
    pub max_plan_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_plan_bytes: default_max_plan_bytes(),
        }
    }
}

impl LimitsConfig {
    /// Validates size limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_plan_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_plan_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_plan_bytes > MAX_PLAN_BYTES_CEILING {
            return Err(ConfigError::Invalid(format!(
                "limits.max_plan_bytes must be at most {MAX_PLAN_BYTES_CEILING}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Where the config path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigSource {
    /// Named by the caller.
    Explicit,
    /// Named by [`CONFIG_ENV_VAR`].
    Environment,
    /// Implicit default file name.
    Default,
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, ConfigSource), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), ConfigSource::Explicit));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), ConfigSource::Environment));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), ConfigSource::Default))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a SQL-style identifier: `[A-Za-z_][A-Za-z0-9_]*`, bounded length.
fn validate_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "{field} exceeds max length ({MAX_IDENTIFIER_LENGTH})"
        )));
    }
    let mut chars = trimmed.chars();
    let leading_ok = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    if !leading_ok || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(ConfigError::Invalid(format!(
            "{field} must match [A-Za-z_][A-Za-z0-9_]*: {trimmed:?}"
        )));
    }
    Ok(())
}

/// Default service name.
fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

/// Default schema list.
fn default_schemas() -> Vec<SchemaConfig> {
    DEFAULT_SCHEMA_NAMES.iter().map(|name| SchemaConfig::named(*name)).collect()
}

/// Default maximum plan size in bytes.
const fn default_max_plan_bytes() -> usize {
    DEFAULT_MAX_PLAN_BYTES
}
