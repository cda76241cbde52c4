// crates/upgrade-gate-core/src/core/version.rs
// ============================================================================
// Module: Upgrade Gate Versions
// Description: Product version parsing and release-level comparison.
// Purpose: Give the version gate a strict, deterministic notion of "same release".
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Product versions have the shape `[v]MAJOR.MINOR[.PATCH]`. Parsing is strict:
//! components are plain ASCII digits and nothing may trail the last component.
//! Comparison happens at release granularity (major and minor); patch levels
//! never distinguish two versions for gating purposes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Version
// ============================================================================

/// Product version `MAJOR.MINOR[.PATCH]`.
///
/// # Invariants
/// - `PartialEq` compares every field, including `patch`. Use
///   [`compare_versions`] for release-level ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    /// Major release number.
    pub major: u32,
    /// Minor release number.
    pub minor: u32,
    /// Optional patch number.
    pub patch: Option<u32>,
}

impl Version {
    /// Creates a release version without a patch component.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            patch: None,
        }
    }

    /// Creates a version with an explicit patch component.
    #[must_use]
    pub const fn with_patch(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch: Some(patch),
        }
    }

    /// Parses a version string of the form `[v]X.Y[.Z]`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionParseError`] when the input has any other shape.
    pub fn parse(raw: &str) -> Result<Self, VersionParseError> {
        let invalid = || VersionParseError {
            raw: raw.to_string(),
        };
        let body = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
        let mut parts = body.split('.');
        let major = parse_component(parts.next()).ok_or_else(invalid)?;
        let minor = parse_component(parts.next()).ok_or_else(invalid)?;
        let patch = match parts.next() {
            Some(part) => Some(parse_component(Some(part)).ok_or_else(invalid)?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

/// Parses one numeric component, rejecting signs and empty input.
fn parse_component(part: Option<&str>) -> Option<u32> {
    let part = part?;
    if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.patch {
            Some(patch) => write!(f, "{}.{}.{}", self.major, self.minor, patch),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Compares two versions at release (major.minor) granularity.
#[must_use]
pub fn compare_versions(left: Version, right: Version) -> Ordering {
    left.major.cmp(&right.major).then(left.minor.cmp(&right.minor))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A version string that does not match `[v]X.Y[.Z]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse version: {raw:?} - expected [v]X.Y[.Z]")]
pub struct VersionParseError {
    /// The rejected input, verbatim.
    pub raw: String,
}
