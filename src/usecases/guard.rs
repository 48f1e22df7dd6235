//! Eligibility Guard - Live Chain Re-validation
//!
//! Re-derives the mutation decision from the chain for every candidate:
//! address shape, account existence, owner program, canonical decode,
//! then the job's silence rule at the current wall-clock second. The
//! index row that surfaced the candidate plays no part here.

use tracing::{debug, instrument};

use crate::domain::eligibility::{Diagnostics, Eligibility, SkipReason};
use crate::domain::error::CandidateError;
use crate::domain::job::SilenceRule;
use crate::ports::chain_client::ChainClient;

const PUBKEY_LEN: usize = 32;

/// Whether `address` is a base58-encoded 32-byte public key.
pub fn is_valid_address(address: &str) -> bool {
  bs58::decode(address)
    .into_vec()
    .is_ok_and(|bytes| bytes.len() == PUBKEY_LEN)
}

/// Chain-side guard for one job run.
pub struct EligibilityGuard<'a> {
  chain: &'a dyn ChainClient,
  program_id: &'a str,
  rule: SilenceRule,
}

impl<'a> EligibilityGuard<'a> {
  pub const fn new(chain: &'a dyn ChainClient, program_id: &'a str, rule: SilenceRule) -> Self {
    Self {
      chain,
      program_id,
      rule,
    }
  }

  /// Evaluate `address` against live chain state at `now_unix`.
  ///
  /// # Errors
  /// `ChainQuery` when the account fetch itself fails. Every other
  /// negative outcome is a skip, not an error.
  #[instrument(skip(self), fields(rule = %self.rule.kind))]
  pub async fn check(&self, address: &str, now_unix: i64) -> Result<Eligibility, CandidateError> {
    if !is_valid_address(address) {
      return Ok(Eligibility::skip(SkipReason::InvalidAddress));
    }

    let Some(raw) = self
      .chain
      .get_account(address)
      .await
      .map_err(|e| CandidateError::ChainQuery(format!("{e:#}")))?
    else {
      return Ok(Eligibility::skip(SkipReason::MissingAccount));
    };

    if raw.owner != self.program_id {
      return Ok(Eligibility::Skip {
        reason: SkipReason::WrongProgramOwner,
        diagnostics: Diagnostics::owner(raw.owner),
      });
    }

    let account = match self.chain.decode_market(&raw.data) {
      Ok(account) => account,
      Err(e) => {
        debug!(error = %e, "Market account did not decode");
        return Ok(Eligibility::skip(SkipReason::UndecodableAccount));
      }
    };

    Ok(self.rule.evaluate(&account, now_unix))
  }
}
