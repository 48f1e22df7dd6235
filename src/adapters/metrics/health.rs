//! Health Probes - Liveness and Readiness
//!
//! `/live` answers 200 while the process runs. `/ready` answers 200
//! until shutdown begins, so the scheduler stops routing triggers to
//! an instance that is draining.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;

/// Shared health state polled by readiness probes.
#[derive(Debug, Clone)]
pub struct HealthState {
    /// Cleared once graceful shutdown starts.
    accepting: Arc<AtomicBool>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (ready by default).
    pub fn new() -> Self {
        Self {
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn begin_shutdown(&self) {
        self.accepting.store(false, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.accepting.load(Ordering::Relaxed)
    }

    /// Liveness probe: always 200 if the process is running.
    pub const fn liveness(&self) -> (StatusCode, &'static str) {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: 200 until shutdown begins.
    pub fn readiness(&self) -> (StatusCode, &'static str) {
        if self.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }
}
