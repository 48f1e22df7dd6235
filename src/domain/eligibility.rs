//! Eligibility verdicts produced by the guard.

use serde::Serialize;

use super::market::ChainMarketAccount;

/// Why a candidate was not acted upon. Expected, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No account exists at the candidate address.
    MissingAccount,
    /// The index holds an address that is not a valid public key.
    InvalidAddress,
    /// Account is owned by a program other than the configured one.
    WrongProgramOwner,
    /// Account bytes do not decode as a market.
    UndecodableAccount,
    NotProposed,
    NotOpen,
    HasDisputes,
    AlreadyResolved,
    AlreadyCancelled,
    ContestWindowOpen,
    MissingContestDeadline,
    NotEndedOnchain,
}

impl SkipReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingAccount => "missing_account",
            Self::InvalidAddress => "invalid_address",
            Self::WrongProgramOwner => "wrong_program_owner",
            Self::UndecodableAccount => "undecodable_account",
            Self::NotProposed => "not_proposed",
            Self::NotOpen => "not_open",
            Self::HasDisputes => "has_disputes",
            Self::AlreadyResolved => "already_resolved",
            Self::AlreadyCancelled => "already_cancelled",
            Self::ContestWindowOpen => "contest_window_open",
            Self::MissingContestDeadline => "missing_contest_deadline",
            Self::NotEndedOnchain => "not_ended_onchain",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chain-side facts recorded alongside a skip, for operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_count: Option<u32>,
    /// Unix second the relevant window closes at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_close: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_closed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Diagnostics {
    pub fn owner(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            ..Self::default()
        }
    }
}

/// Outcome of re-validating a candidate against live chain state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// Still eligible; carries the freshly decoded account.
    Proceed { account: ChainMarketAccount },
    Skip {
        reason: SkipReason,
        diagnostics: Diagnostics,
    },
}

impl Eligibility {
    pub const fn skip(reason: SkipReason) -> Self {
        Self::Skip {
            reason,
            diagnostics: Diagnostics {
                status: None,
                dispute_count: None,
                window_close: None,
                window_closed: None,
                owner: None,
            },
        }
    }

    pub const fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed { .. })
    }

    pub const fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Skip { reason, .. } => Some(*reason),
            Self::Proceed { .. } => None,
        }
    }
}
