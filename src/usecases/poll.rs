//! Bounded polling on `tokio::time`.
//!
//! The hard timeout wraps the whole loop, so a slow probe cannot push
//! the deadline out.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};

/// Result of `poll_until`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
  /// The probe produced a value.
  Ready(T),
  /// The timeout elapsed first.
  TimedOut { waited: Duration },
}

/// Call `probe` every `interval` until it yields `Some`, or `limit` elapses.
///
/// The first probe runs immediately.
pub async fn poll_until<F, Fut, T>(mut probe: F, interval: Duration, limit: Duration) -> PollOutcome<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Option<T>>,
{
  let started = Instant::now();
  let polling = async {
    loop {
      if let Some(value) = probe().await {
        return value;
      }
      sleep(interval).await;
    }
  };

  match timeout(limit, polling).await {
    Ok(value) => PollOutcome::Ready(value),
    Err(_) => PollOutcome::TimedOut {
      waited: started.elapsed(),
    },
  }
}
