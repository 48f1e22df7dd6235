//! Domain layer - Core reconciliation types and rules.
//!
//! Pure logic for the resolution reconciler: the market state machine,
//! the shared "act on silence" rule, eligibility verdicts, transaction
//! outcomes and the error taxonomy. No I/O happens here (hexagonal
//! architecture inner ring); everything is testable in isolation.

pub mod eligibility;
pub mod error;
pub mod job;
pub mod market;
pub mod outcome;

// Re-export core types for convenience
pub use eligibility::{Diagnostics, Eligibility, SkipReason};
pub use error::{CandidateError, DecodeError, JobError};
pub use job::{JobKind, SilenceRule};
pub use market::{
    ChainMarketAccount, ChainMarketStatus, IndexMarket, MarketAddress, ResolutionStatus,
    TxSignature,
};
pub use outcome::{CandidateResult, JobSummary, TxOutcome};
