// crates/upgrade-gate-core/src/runtime/cancel.rs
// ============================================================================
// Module: Upgrade Cancellation
// Description: Cooperative cancellation flag shared with the executor.
// Purpose: Let callers stop an upgrade between steps without interrupting a runner.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! Cancellation is observed only at step boundaries. A step already handed to
//! the runner runs to completion (or failure) on the runner's terms.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Set once cancellation has been requested.
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
