//! Transaction Orchestrator - Build, Submit, Confirm
//!
//! Drives one instruction from construction to a terminal outcome.
//! A confirmation timeout is reported as such and never resubmitted:
//! the transaction may still land, and the next run's guard will see
//! the terminal chain state.

use std::time::Duration;

use tracing::{info, instrument, warn};

use super::poll::{poll_until, PollOutcome};
use crate::domain::job::JobKind;
use crate::domain::outcome::TxOutcome;
use crate::ports::chain_client::{ChainClient, SignatureStatus, SubmitOptions};

/// Submission and confirmation tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPolicy {
  pub poll_interval: Duration,
  pub timeout: Duration,
  pub max_retries: usize,
}

impl Default for ConfirmPolicy {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_millis(1200),
      timeout: Duration::from_secs(90),
      max_retries: 3,
    }
  }
}

/// Build, sign, submit and confirm the job instruction for `market`.
#[instrument(skip(chain, policy), fields(instruction = kind.instruction()))]
pub async fn submit_and_confirm(
  chain: &dyn ChainClient,
  kind: JobKind,
  market: &str,
  policy: ConfirmPolicy,
) -> TxOutcome {
  let tx = match chain.build_instruction(kind, market).await {
    Ok(tx) => tx,
    Err(e) => return TxOutcome::SubmitError { error: format!("{e:#}") },
  };

  let options = SubmitOptions {
    preflight: true,
    max_retries: policy.max_retries,
  };
  let signature = match chain.sign_and_submit(&tx, options).await {
    Ok(signature) => signature,
    Err(e) => {
      warn!(error = %format!("{e:#}"), "Submission rejected");
      return TxOutcome::SubmitError { error: format!("{e:#}") };
    }
  };
  info!(%signature, "Submitted, awaiting confirmation");

  let sig = signature.as_str();
  let probe = move || async move {
    match chain.signature_status(sig).await {
      Ok(status) if status.is_terminal() => Some(status),
      Ok(_) => None,
      Err(e) => {
        warn!(signature = sig, error = %e, "Signature status query failed");
        None
      }
    }
  };

  let outcome = poll_until(probe, policy.poll_interval, policy.timeout).await;
  match outcome {
    PollOutcome::Ready(SignatureStatus::Failed(program_error)) => TxOutcome::OnchainRevert {
      signature,
      program_error,
    },
    PollOutcome::Ready(_) => TxOutcome::Success { signature },
    PollOutcome::TimedOut { waited } => TxOutcome::ConfirmationTimeout {
      signature,
      waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
    },
  }
}
