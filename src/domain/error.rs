//! Error taxonomy for reconciliation runs.
//!
//! Job-level errors abort the whole invocation and map to an HTTP
//! status at the trigger. Candidate-level errors are captured into the
//! failing candidate's result entry and never abort the batch.

use thiserror::Error;

use super::market::TxSignature;

/// Failures that abort a whole job invocation.
#[derive(Error, Debug)]
pub enum JobError {
    /// Bearer token missing or not equal to the shared cron secret.
    #[error("unauthorized")]
    Auth,

    /// Another invocation of the same job still holds the lease.
    #[error("job {job} is already running")]
    LeaseHeld { job: String },

    /// Index query or chain-client initialization failed.
    #[error("{step} failed: {source:#}")]
    UpstreamQuery {
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl JobError {
    pub const STEP_AUTH: &'static str = "auth";
    pub const STEP_LEASE: &'static str = "lease";
    pub const STEP_CHAIN_INIT: &'static str = "chain_init";
    pub const STEP_SCAN: &'static str = "scan";
    /// The detached run task itself died (runtime shutdown or a panic
    /// outside the per-candidate boundary).
    pub const STEP_RUN: &'static str = "run";

    pub fn upstream(step: &'static str, source: anyhow::Error) -> Self {
        Self::UpstreamQuery { step, source }
    }

    /// Pipeline phase that failed, reported as `step` in the response.
    pub const fn step(&self) -> &'static str {
        match self {
            Self::Auth => Self::STEP_AUTH,
            Self::LeaseHeld { .. } => Self::STEP_LEASE,
            Self::UpstreamQuery { step, .. } => *step,
        }
    }
}

/// Failures isolated to a single candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CandidateError {
    /// RPC failure while fetching the account for the guard.
    #[error("chain query failed: {0}")]
    ChainQuery(String),

    /// Rejected before landing (RPC or preflight simulation).
    #[error("transaction submit failed: {0}")]
    TransactionSubmit(String),

    /// Landed, but the program returned an error.
    #[error("transaction {signature} reverted: {program_error}")]
    TransactionRevert {
        signature: TxSignature,
        program_error: String,
    },

    /// No terminal status observed; on-chain landing is unknown.
    #[error("transaction {signature} not confirmed within {waited_ms}ms")]
    ConfirmationTimeout { signature: TxSignature, waited_ms: u64 },

    /// Confirmed on-chain, but the index row could not be updated.
    #[error("index update after confirmed transaction {signature} failed: {error}")]
    ReconciliationWrite { signature: TxSignature, error: String },

    /// The candidate's pipeline panicked.
    #[error("candidate pipeline panicked: {0}")]
    Panicked(String),
}

impl CandidateError {
    /// Stable machine-readable reason, reported as `reason`.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::ChainQuery(_) => "chain_query_error",
            Self::TransactionSubmit(_) => "submit_error",
            Self::TransactionRevert { .. } => "onchain_revert",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::ReconciliationWrite { .. } => "reconciliation_write_error",
            Self::Panicked(_) => "panicked",
        }
    }

    /// Signature of the transaction involved, when one was produced.
    pub fn signature(&self) -> Option<&str> {
        match self {
            Self::TransactionRevert { signature, .. }
            | Self::ConfirmationTimeout { signature, .. }
            | Self::ReconciliationWrite { signature, .. } => Some(signature),
            Self::ChainQuery(_) | Self::TransactionSubmit(_) | Self::Panicked(_) => None,
        }
    }
}

/// Raw account bytes that do not decode into a market.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("account data too short: {len} bytes")]
    TooShort { len: usize },

    #[error("account discriminator does not match Market")]
    Discriminator,

    #[error("malformed market account: {0}")]
    Malformed(String),
}
