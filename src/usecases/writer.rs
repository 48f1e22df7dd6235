//! Reconciliation Writer - Index Write-back After Confirmation
//!
//! Runs only once the chain transition is confirmed. The patch is
//! keyed by market address; a failure here leaves chain and index
//! out of sync, so it is surfaced with the confirmed signature.

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};

use crate::domain::error::CandidateError;
use crate::domain::job::{JobKind, NO_PROPOSAL_CANCEL_REASON};
use crate::domain::market::{ChainMarketAccount, IndexMarket, ResolutionStatus, TxSignature};
use crate::ports::index::{IndexRepository, MarketPatch};

/// Row patch recording a confirmed transition.
///
/// The finalized outcome is the index's proposed outcome, falling back
/// to the outcome proposed on-chain.
pub fn reconciliation_patch(
  kind: JobKind,
  row: &IndexMarket,
  account: &ChainMarketAccount,
  signature: &str,
  now: DateTime<Utc>,
) -> MarketPatch {
  match kind {
    JobKind::Finalize => MarketPatch {
      resolution_status: Some(ResolutionStatus::Finalized),
      resolved: Some(true),
      cancelled: Some(false),
      winning_outcome: row.proposed_winning_outcome.or(account.proposed_outcome),
      resolved_at: Some(now),
      resolve_tx: Some(signature.to_string()),
      ..MarketPatch::default()
    },
    JobKind::Cancel => MarketPatch {
      resolution_status: Some(ResolutionStatus::Cancelled),
      cancelled: Some(true),
      cancel_reason: Some(NO_PROPOSAL_CANCEL_REASON.to_string()),
      cancelled_at: Some(now),
      cancel_tx: Some(signature.to_string()),
      ..MarketPatch::default()
    },
  }
}

/// Write the confirmed transition back to the index.
///
/// `account` is the chain state the guard validated before submission.
#[instrument(skip(index, row, account), fields(market = %row.address))]
pub async fn write_back(
  index: &dyn IndexRepository,
  kind: JobKind,
  row: &IndexMarket,
  account: &ChainMarketAccount,
  signature: TxSignature,
  now: DateTime<Utc>,
) -> Result<TxSignature, CandidateError> {
  let from = account.status.as_resolution();
  let to = kind.target_status();
  if !from.can_transition_to(to) {
    return Err(CandidateError::ReconciliationWrite {
      signature,
      error: format!("illegal index transition {from} -> {to}"),
    });
  }

  let patch = reconciliation_patch(kind, row, account, &signature, now);
  match index.update_by_address(&row.address, &patch).await {
    Ok(()) => {
      info!(%signature, status = %to, "Index reconciled");
      Ok(signature)
    }
    Err(e) => {
      error!(
        %signature,
        error = %format!("{e:#}"),
        "Index write failed after confirmed transaction, manual repair required"
      );
      Err(CandidateError::ReconciliationWrite {
        signature,
        error: format!("{e:#}"),
      })
    }
  }
}
