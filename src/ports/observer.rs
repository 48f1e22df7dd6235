//! Run Observer Port - Outcome Telemetry
//!
//! The job runner reports what happened; the adapter decides how it is
//! exported (Prometheus in production, nothing in most tests).

use std::time::Duration;

use crate::domain::job::JobKind;
use crate::domain::outcome::CandidateResult;

pub trait RunObserver: Send + Sync + 'static {
  /// A run ended at `step` (`complete` or the failing step).
  fn run_finished(&self, kind: JobKind, step: &str, finished_unix: i64);

  /// One candidate reached its final result.
  fn candidate_finished(&self, kind: JobKind, result: &CandidateResult);

  /// Submission-to-confirmation latency of a successful transaction.
  fn confirmation_latency(&self, kind: JobKind, elapsed: Duration);
}

/// Observer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {
  fn run_finished(&self, _kind: JobKind, _step: &str, _finished_unix: i64) {}

  fn candidate_finished(&self, _kind: JobKind, _result: &CandidateResult) {}

  fn confirmation_latency(&self, _kind: JobKind, _elapsed: Duration) {}
}
