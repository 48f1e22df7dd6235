//! Transaction outcomes and the per-run summary returned to the trigger.

use serde::Serialize;

use super::eligibility::{Diagnostics, SkipReason};
use super::error::CandidateError;
use super::market::{MarketAddress, TxSignature};

/// Terminal result of submitting and confirming one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Confirmed (or finalized) without error.
    Success { signature: TxSignature },
    /// Landed, but the program returned an error.
    OnchainRevert {
        signature: TxSignature,
        program_error: String,
    },
    /// Rejected before landing (RPC error, preflight simulation failure).
    SubmitError { error: String },
    /// No terminal status observed within the confirmation window.
    ConfirmationTimeout {
        signature: TxSignature,
        waited_ms: u64,
    },
}

impl TxOutcome {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::OnchainRevert { .. } => "onchain_revert",
            Self::SubmitError { .. } => "submit_error",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
        }
    }

    /// Confirmed signature, or the candidate error describing why not.
    pub fn into_confirmed(self) -> Result<TxSignature, CandidateError> {
        match self {
            Self::Success { signature } => Ok(signature),
            Self::OnchainRevert {
                signature,
                program_error,
            } => Err(CandidateError::TransactionRevert {
                signature,
                program_error,
            }),
            Self::SubmitError { error } => Err(CandidateError::TransactionSubmit(error)),
            Self::ConfirmationTimeout {
                signature,
                waited_ms,
            } => Err(CandidateError::ConfirmationTimeout {
                signature,
                waited_ms,
            }),
        }
    }
}

/// One entry of `results[]` in the job response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateResult {
    pub market: MarketAddress,
    pub ok: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "txSig", skip_serializing_if = "Option::is_none")]
    pub tx_sig: Option<TxSignature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

impl CandidateResult {
    /// Reason reported for eligible candidates of a dry run.
    pub const DRY_RUN: &'static str = "dry_run";

    pub fn succeeded(market: impl Into<MarketAddress>, signature: TxSignature) -> Self {
        Self {
            market: market.into(),
            ok: true,
            skip: false,
            reason: None,
            tx_sig: Some(signature),
            error: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn skipped(
        market: impl Into<MarketAddress>,
        reason: SkipReason,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            market: market.into(),
            ok: false,
            skip: true,
            reason: Some(reason.as_str().to_string()),
            tx_sig: None,
            error: None,
            diagnostics,
        }
    }

    /// Eligible, but nothing was submitted because the run is a dry run.
    pub fn dry_run(market: impl Into<MarketAddress>) -> Self {
        Self {
            market: market.into(),
            ok: true,
            skip: true,
            reason: Some(Self::DRY_RUN.to_string()),
            tx_sig: None,
            error: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn failed(market: impl Into<MarketAddress>, error: &CandidateError) -> Self {
        Self {
            market: market.into(),
            ok: false,
            skip: false,
            reason: Some(error.reason().to_string()),
            tx_sig: error.signature().map(ToString::to_string),
            error: Some(error.to_string()),
            diagnostics: Diagnostics::default(),
        }
    }
}

/// Body returned by a job trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub ok: bool,
    pub step: String,
    pub count: usize,
    pub results: Vec<CandidateResult>,
}

impl JobSummary {
    pub const STEP_COMPLETE: &'static str = "complete";

    pub fn complete(results: Vec<CandidateResult>) -> Self {
        Self {
            ok: true,
            step: Self::STEP_COMPLETE.to_string(),
            count: results.len(),
            results,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.ok && !r.skip).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.skip).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.ok && !r.skip).count()
    }

    pub fn result_for(&self, market: &str) -> Option<&CandidateResult> {
        self.results.iter().find(|r| r.market == market)
    }
}
