// crates/upgrade-gate-core/src/runtime/audit.rs
// ============================================================================
// Module: Upgrade Audit Logging
// Description: Structured audit events for upgrade state transitions.
// Purpose: Emit JSON-line audit records without a hard logging dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every executor transition (start, version check, each step, completion or
//! abort) produces an [`UpgradeAuditEvent`]. Sinks decide where events go.
//! Sink failures are swallowed: losing an audit line never changes the
//! outcome of an upgrade.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

use crate::core::SchemaName;
use crate::core::Version;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Executor transition recorded by an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeEventKind {
    /// The upgrade began; emitted before the runner is constructed.
    UpgradeStarted,
    /// The installed version matched the plan.
    VersionCheckPassed,
    /// The caller bypassed the version check.
    VersionCheckSkipped,
    /// The version check rejected the installation.
    VersionCheckFailed,
    /// A step is being handed to the runner.
    StepStarted,
    /// The runner applied a step.
    StepApplied,
    /// Every step was applied.
    UpgradeCompleted,
    /// The upgrade stopped on an error.
    UpgradeAborted,
}

/// Upgrade audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeAuditEvent {
    /// Event identifier.
    pub event: String,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Transition kind.
    pub kind: UpgradeEventKind,
    /// Plan fingerprint when available.
    pub plan_hash: Option<String>,
    /// Plan starting version.
    pub from: Version,
    /// Plan target version.
    pub to: Version,
    /// Step index for step-scoped events.
    pub step: Option<usize>,
    /// Step instance version for step-scoped events.
    pub version: Option<Version>,
    /// Schemas touched by the step, in dispatch order.
    pub schemas: Vec<SchemaName>,
    /// Error text for failure events.
    pub error: Option<String>,
}

/// Inputs required to construct an audit event.
pub struct UpgradeAuditEventParams {
    /// Transition kind.
    pub kind: UpgradeEventKind,
    /// Plan fingerprint when available.
    pub plan_hash: Option<String>,
    /// Plan starting version.
    pub from: Version,
    /// Plan target version.
    pub to: Version,
    /// Step index for step-scoped events.
    pub step: Option<usize>,
    /// Step instance version for step-scoped events.
    pub version: Option<Version>,
    /// Schemas touched by the step.
    pub schemas: Vec<SchemaName>,
    /// Error text for failure events.
    pub error: Option<String>,
}

impl UpgradeAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: UpgradeAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "upgrade_audit".to_string(),
            timestamp_ms,
            kind: params.kind,
            plan_hash: params.plan_hash,
            from: params.from,
            to: params.to,
            step: params.step,
            version: params.version,
            schemas: params.schemas,
            error: params.error,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Destination for upgrade audit events.
pub trait UpgradeAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &UpgradeAuditEvent);
}

/// Audit sink that discards events.
pub struct NoopAuditSink;

impl UpgradeAuditSink for NoopAuditSink {
    fn record(&self, _event: &UpgradeAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl UpgradeAuditSink for StderrAuditSink {
    fn record(&self, event: &UpgradeAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl UpgradeAuditSink for FileAuditSink {
    fn record(&self, event: &UpgradeAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that keeps events in memory for tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditSink {
    /// Recorded events in emission order.
    events: Arc<Mutex<Vec<UpgradeAuditEvent>>>,
}

impl InMemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<UpgradeAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the recorded event kinds in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<UpgradeEventKind> {
        self.events().iter().map(|event| event.kind).collect()
    }
}

impl UpgradeAuditSink for InMemoryAuditSink {
    fn record(&self, event: &UpgradeAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
