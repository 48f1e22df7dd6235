//! Job kinds and the "default outcome after silence" rule.
//!
//! Both automated transitions share one shape: a time-bound window
//! closes while an absence condition still holds, so the default
//! resolution is applied. `SilenceRule` captures that shape once and is
//! parameterised by `JobKind`; it is evaluated twice per market, first
//! as an index predicate (candidate discovery) and then against the
//! freshly decoded chain account (the only source of truth for acting).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::eligibility::{Diagnostics, Eligibility, SkipReason};
use super::market::{ChainMarketAccount, ChainMarketStatus, ResolutionStatus};

/// Grace period after `end_date` during which the creator may still propose.
pub const NO_PROPOSAL_GRACE_HOURS: i64 = 48;

/// `cancel_reason` written to the index by the cancel job.
pub const NO_PROPOSAL_CANCEL_REASON: &str = "no_proposal_48h";

/// The two scheduled reconciliation jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Finalize proposals whose contest window closed without disputes.
    Finalize,
    /// Cancel markets nobody proposed a result for after the grace period.
    Cancel,
}

impl JobKind {
    pub const ALL: [Self; 2] = [Self::Finalize, Self::Cancel];

    /// Stable job name used for leases, logs, metrics and trigger routes.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Finalize => "finalize-no-disputes",
            Self::Cancel => "cancel-no-proposal",
        }
    }

    /// Anchor instruction invoked on-chain for this job.
    pub const fn instruction(self) -> &'static str {
        match self {
            Self::Finalize => "finalize_if_no_disputes",
            Self::Cancel => "cancel_if_no_proposal",
        }
    }

    /// Index status a candidate must currently have.
    pub const fn source_status(self) -> ResolutionStatus {
        match self {
            Self::Finalize => ResolutionStatus::Proposed,
            Self::Cancel => ResolutionStatus::Open,
        }
    }

    /// Index status written after a confirmed transition.
    pub const fn target_status(self) -> ResolutionStatus {
        match self {
            Self::Finalize => ResolutionStatus::Finalized,
            Self::Cancel => ResolutionStatus::Cancelled,
        }
    }

    pub const fn rule(self) -> SilenceRule {
        SilenceRule { kind: self }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Index column a scan predicate applies its window cutoff to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowColumn {
    ContestDeadline,
    EndDate,
}

impl WindowColumn {
    pub const fn column(self) -> &'static str {
        match self {
            Self::ContestDeadline => "contest_deadline",
            Self::EndDate => "end_date",
        }
    }
}

/// "If a time-bound window closes with an absence condition true,
/// apply the default resolution."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceRule {
    pub kind: JobKind,
}

impl SilenceRule {
    /// Which index column carries the window, and the cutoff it must be `<=`.
    ///
    /// The cancel cutoff lags `now` by the proposal grace period; the
    /// finalize cutoff is `now` itself.
    pub fn index_window(self, now: DateTime<Utc>) -> (WindowColumn, DateTime<Utc>) {
        match self.kind {
            JobKind::Finalize => (WindowColumn::ContestDeadline, now),
            JobKind::Cancel => (
                WindowColumn::EndDate,
                now - Duration::hours(NO_PROPOSAL_GRACE_HOURS),
            ),
        }
    }

    /// Unix second at which the on-chain window closes, if known.
    pub const fn chain_window_close(self, account: &ChainMarketAccount) -> Option<i64> {
        match self.kind {
            JobKind::Finalize => account.contest_deadline,
            JobKind::Cancel => Some(account.resolution_time),
        }
    }

    const fn expected_chain_status(self) -> ChainMarketStatus {
        match self.kind {
            JobKind::Finalize => ChainMarketStatus::Proposed,
            JobKind::Cancel => ChainMarketStatus::Open,
        }
    }

    /// First violated absence condition, if any.
    const fn absence_violation(self, account: &ChainMarketAccount) -> Option<SkipReason> {
        match self.kind {
            JobKind::Finalize if account.dispute_count > 0 => Some(SkipReason::HasDisputes),
            JobKind::Finalize => None,
            JobKind::Cancel if account.resolved => Some(SkipReason::AlreadyResolved),
            JobKind::Cancel if account.cancelled => Some(SkipReason::AlreadyCancelled),
            JobKind::Cancel => None,
        }
    }

    const fn window_open_reason(self) -> SkipReason {
        match self.kind {
            JobKind::Finalize => SkipReason::ContestWindowOpen,
            JobKind::Cancel => SkipReason::NotEndedOnchain,
        }
    }

    /// Evaluate the rule against live chain state at `now_unix`.
    ///
    /// - finalize: `status == proposed ∧ dispute_count == 0 ∧ now ≥ contest_deadline`
    /// - cancel: `status == open ∧ ¬resolved ∧ ¬cancelled ∧ now ≥ resolution_time`
    pub fn evaluate(self, account: &ChainMarketAccount, now_unix: i64) -> Eligibility {
        let window_close = self.chain_window_close(account);
        let window_closed = window_close.is_some_and(|t| now_unix >= t);

        let diagnostics = Diagnostics {
            status: Some(account.status.as_str().to_string()),
            dispute_count: Some(account.dispute_count),
            window_close,
            window_closed: Some(window_closed),
            owner: None,
        };

        let reason = if account.status != self.expected_chain_status() {
            Some(match self.kind {
                JobKind::Finalize => SkipReason::NotProposed,
                JobKind::Cancel => SkipReason::NotOpen,
            })
        } else if let Some(reason) = self.absence_violation(account) {
            Some(reason)
        } else if window_close.is_none() {
            Some(SkipReason::MissingContestDeadline)
        } else if !window_closed {
            Some(self.window_open_reason())
        } else {
            None
        };

        match reason {
            Some(reason) => Eligibility::Skip {
                reason,
                diagnostics,
            },
            None => Eligibility::Proceed {
                account: account.clone(),
            },
        }
    }
}
