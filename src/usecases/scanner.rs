//! Candidate Scanner - Index Discovery
//!
//! Selects rows the index believes are ready for a job. The index is
//! only a discovery cache; every row returned here is re-validated
//! against chain state before anything is mutated.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::domain::job::JobKind;
use crate::domain::market::IndexMarket;
use crate::ports::index::{Filter, IndexRepository};

/// Typed predicate for a job's candidates at `now`.
///
/// - finalize: `proposed ∧ ¬resolved ∧ ¬cancelled ∧ contest_deadline ≤ now`
/// - cancel: `open ∧ ¬resolved ∧ ¬cancelled ∧ end_date ≤ now − 48h`
pub fn candidate_filters(kind: JobKind, now: DateTime<Utc>) -> Vec<Filter> {
  let (window, cutoff) = kind.rule().index_window(now);
  vec![
    Filter::status(kind.source_status()),
    Filter::flag("resolved", false),
    Filter::flag("cancelled", false),
    Filter::not_after(window.column(), cutoff),
  ]
}

/// Query at most `limit` candidates, dropping rows without an address.
#[instrument(skip(index))]
pub async fn scan(
  index: &dyn IndexRepository,
  kind: JobKind,
  now: DateTime<Utc>,
  limit: usize,
) -> Result<Vec<IndexMarket>> {
  let rows = index.query(&candidate_filters(kind, now), limit).await?;
  let total = rows.len();

  let candidates: Vec<IndexMarket> = rows
    .into_iter()
    .filter(|row| !row.address.trim().is_empty())
    .collect();

  debug!(total, kept = candidates.len(), "Candidates scanned");
  Ok(candidates)
}
