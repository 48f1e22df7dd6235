//! In-memory Job Lease
//!
//! Process-local lease table keyed by job name. A single reconciler
//! process serves every trigger, so a mutex-guarded map is enough to
//! reject overlapping runs of the same job. Expiry uses
//! `tokio::time::Instant` so a crashed run cannot hold a lease forever.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ports::lease::{JobLease, LeaseToken};

#[derive(Debug, Clone, Copy)]
struct Held {
    holder: Uuid,
    expires_at: Instant,
}

/// Lease table shared by all job runners of this process.
#[derive(Debug, Default)]
pub struct InMemoryLease {
    held: Mutex<HashMap<String, Held>>,
}

impl InMemoryLease {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobLease for InMemoryLease {
    async fn try_acquire(&self, job: &str, ttl: Duration) -> Result<Option<LeaseToken>> {
        let now = Instant::now();
        let mut held = self.held.lock().await;

        if let Some(current) = held.get(job) {
            if current.expires_at > now {
                debug!(job, holder = %current.holder, "Lease held");
                return Ok(None);
            }
            warn!(job, holder = %current.holder, "Taking over expired lease");
        }

        let holder = Uuid::new_v4();
        held.insert(
            job.to_string(),
            Held {
                holder,
                expires_at: now + ttl,
            },
        );

        Ok(Some(LeaseToken {
            job: job.to_string(),
            holder,
        }))
    }

    async fn release(&self, token: &LeaseToken) -> Result<()> {
        let mut held = self.held.lock().await;
        if held.get(&token.job).is_some_and(|h| h.holder == token.holder) {
            held.remove(&token.job);
        }
        Ok(())
    }
}
