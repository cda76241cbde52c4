// crates/upgrade-gate-config/src/lib.rs
// ============================================================================
// Module: Upgrade Gate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for upgrade-gate.toml semantics.
// Dependencies: upgrade-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `upgrade-gate-config` defines the configuration model for Upgrade Gate:
//! the gating service, the schema universe, audit logging, and input limits.
//! Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
