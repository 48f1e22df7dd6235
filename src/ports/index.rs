//! Index Repository Port - Off-chain Market Index Interface
//!
//! The index is a query cache over market accounts. It is trusted for
//! candidate discovery only; every mutation decision is re-derived
//! from chain state. Writes are row-scoped by market address and there
//! is no cross-row transactionality.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::domain::market::{IndexMarket, ResolutionStatus, TxSignature};

/// Scalar operand of a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
  Text(String),
  Bool(bool),
  Time(DateTime<Utc>),
}

impl FilterValue {
  /// Canonical textual form (RFC3339 with `Z` for timestamps).
  pub fn render(&self) -> String {
    match self {
      Self::Text(s) => s.clone(),
      Self::Bool(b) => b.to_string(),
      Self::Time(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
  }
}

/// Column predicate understood by every index backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
  Eq(&'static str, FilterValue),
  Lte(&'static str, FilterValue),
}

impl Filter {
  pub fn status(status: ResolutionStatus) -> Self {
    Self::Eq("resolution_status", FilterValue::Text(status.as_str().to_string()))
  }

  pub const fn flag(column: &'static str, value: bool) -> Self {
    Self::Eq(column, FilterValue::Bool(value))
  }

  pub const fn not_after(column: &'static str, cutoff: DateTime<Utc>) -> Self {
    Self::Lte(column, FilterValue::Time(cutoff))
  }

  pub const fn column(&self) -> &'static str {
    match self {
      Self::Eq(c, _) | Self::Lte(c, _) => *c,
    }
  }

  /// Evaluate against a row; used by in-memory backends and tests.
  pub fn matches(&self, row: &IndexMarket) -> bool {
    match self {
      Self::Eq(col, value) => match (*col, value) {
        ("resolution_status", FilterValue::Text(s)) => row.resolution_status.as_str() == s.as_str(),
        ("resolved", FilterValue::Bool(b)) => row.resolved == *b,
        ("cancelled", FilterValue::Bool(b)) => row.cancelled == *b,
        ("market_address", FilterValue::Text(s)) => row.address == *s,
        _ => false,
      },
      Self::Lte(col, FilterValue::Time(cutoff)) => {
        let value = match *col {
          "contest_deadline" => row.contest_deadline,
          "end_date" => row.end_date,
          "resolved_at" => row.resolved_at,
          "cancelled_at" => row.cancelled_at,
          _ => None,
        };
        value.is_some_and(|v| v <= *cutoff)
      }
      Self::Lte(..) => false,
    }
  }
}

/// Partial update applied to one index row. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarketPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resolution_status: Option<ResolutionStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resolved: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cancelled: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub winning_outcome: Option<u8>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resolved_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resolve_tx: Option<TxSignature>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cancel_reason: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cancelled_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cancel_tx: Option<TxSignature>,
}

impl MarketPatch {
  /// Apply the patch to an in-memory row.
  pub fn apply_to(&self, row: &mut IndexMarket) {
    if let Some(status) = self.resolution_status {
      row.resolution_status = status;
    }
    if let Some(resolved) = self.resolved {
      row.resolved = resolved;
    }
    if let Some(cancelled) = self.cancelled {
      row.cancelled = cancelled;
    }
    if self.winning_outcome.is_some() {
      row.winning_outcome = self.winning_outcome;
    }
    if self.resolved_at.is_some() {
      row.resolved_at = self.resolved_at;
    }
    if self.resolve_tx.is_some() {
      row.resolve_tx.clone_from(&self.resolve_tx);
    }
    if self.cancel_reason.is_some() {
      row.cancel_reason.clone_from(&self.cancel_reason);
    }
    if self.cancelled_at.is_some() {
      row.cancelled_at = self.cancelled_at;
    }
    if self.cancel_tx.is_some() {
      row.cancel_tx.clone_from(&self.cancel_tx);
    }
  }
}

/// Read/update access to the off-chain market index.
#[async_trait]
pub trait IndexRepository: Send + Sync + 'static {
  /// Rows matching every filter, at most `limit`, backend default order.
  async fn query(&self, filters: &[Filter], limit: usize) -> anyhow::Result<Vec<IndexMarket>>;

  /// Patch the row keyed by `address`.
  async fn update_by_address(&self, address: &str, patch: &MarketPatch) -> anyhow::Result<()>;

  /// Check if the index backend is reachable.
  async fn is_healthy(&self) -> bool;
}
