//! Job Lease Port - Run-overlap Protection
//!
//! Sequential processing with a single fee payer assumes that two
//! invocations of the same job never overlap. The lease makes that
//! explicit: it is keyed by job name, expires after a TTL slightly
//! longer than the worst-case run, is acquired before scanning and is
//! released when the run completes.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

/// Proof of lease ownership, required to release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseToken {
  /// Job name the lease is keyed by.
  pub job: String,
  /// Unique id of the holder (one per invocation).
  pub holder: Uuid,
}

#[async_trait]
pub trait JobLease: Send + Sync + 'static {
  /// Try to take the lease. `Ok(None)` when a live lease is held by someone else.
  async fn try_acquire(&self, job: &str, ttl: Duration) -> anyhow::Result<Option<LeaseToken>>;

  /// Release a lease previously acquired. Releasing an expired or
  /// foreign lease is a no-op.
  async fn release(&self, token: &LeaseToken) -> anyhow::Result<()>;
}
