//! Market domain types.
//!
//! A market lives in two places: the authoritative on-chain account
//! and the off-chain index row that mirrors it with some lag. This
//! module holds both representations plus the resolution state machine
//! that governs what this service may write back to the index.
//!
//! Exposes two API surfaces:
//! - `IndexMarket` / `ResolutionStatus` for the off-chain cache
//! - `ChainMarketAccount` / `ChainMarketStatus` for decoded chain truth

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ────────────────────────────────────────────
// Type aliases consumed by ports and adapters
// ────────────────────────────────────────────

/// Base58 market account address, used as the index row key.
pub type MarketAddress = String;

/// Base58 transaction signature.
pub type TxSignature = String;

// ────────────────────────────────────────────
// Resolution state machine
// ────────────────────────────────────────────

/// Off-chain resolution status of a market.
///
/// `Finalized` and `Cancelled` are terminal. Unrecognised values read
/// from the index decode to `Unknown` and are never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Open,
    Proposed,
    Finalized,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ResolutionStatus {
    /// Wire representation used in the index.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Proposed => "proposed",
            Self::Finalized => "finalized",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Cancelled)
    }

    /// Whether this service is allowed to move a market from `self` to `next`.
    ///
    /// Only the two "default outcome after silence" transitions are
    /// reachable here; `open → proposed` belongs to the market creator.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Cancelled) | (Self::Proposed, Self::Finalized)
        )
    }
}

impl std::fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────
// Off-chain index row
// ────────────────────────────────────────────

/// A row of the off-chain `markets` index.
///
/// Only the columns this service reads or writes are modelled; any
/// other column returned by the store is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMarket {
    /// Chain account address (`market_address` column). Null reads as empty.
    #[serde(rename = "market_address", default, deserialize_with = "null_as_empty")]
    pub address: MarketAddress,
    pub resolution_status: ResolutionStatus,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub proposed_winning_outcome: Option<u8>,
    #[serde(default)]
    pub contest_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub winning_outcome: Option<u8>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolve_tx: Option<TxSignature>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancel_tx: Option<TxSignature>,
}

impl IndexMarket {
    /// A fresh `open` row, as market creation writes it.
    pub fn open(address: impl Into<MarketAddress>, end_date: DateTime<Utc>) -> Self {
        Self {
            address: address.into(),
            resolution_status: ResolutionStatus::Open,
            resolved: false,
            cancelled: false,
            proposed_winning_outcome: None,
            contest_deadline: None,
            end_date: Some(end_date),
            winning_outcome: None,
            resolved_at: None,
            resolve_tx: None,
            cancel_reason: None,
            cancelled_at: None,
            cancel_tx: None,
        }
    }

    /// Mark the row as proposed, mirroring the creator's proposal.
    #[must_use]
    pub fn proposed(mut self, outcome: u8, contest_deadline: DateTime<Utc>) -> Self {
        self.resolution_status = ResolutionStatus::Proposed;
        self.proposed_winning_outcome = Some(outcome);
        self.contest_deadline = Some(contest_deadline);
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ────────────────────────────────────────────
// On-chain account (canonical decoded form)
// ────────────────────────────────────────────

/// Market status as stored by the on-chain program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainMarketStatus {
    Open,
    Proposed,
    Finalized,
    Cancelled,
}

impl ChainMarketStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Proposed => "proposed",
            Self::Finalized => "finalized",
            Self::Cancelled => "cancelled",
        }
    }

    /// The index status that mirrors this chain status.
    pub const fn as_resolution(self) -> ResolutionStatus {
        match self {
            Self::Open => ResolutionStatus::Open,
            Self::Proposed => ResolutionStatus::Proposed,
            Self::Finalized => ResolutionStatus::Finalized,
            Self::Cancelled => ResolutionStatus::Cancelled,
        }
    }
}

impl std::fmt::Display for ChainMarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical view of an on-chain market account.
///
/// Produced by exactly one decoder at the chain adapter boundary;
/// business logic never looks at raw account bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMarketAccount {
    pub status: ChainMarketStatus,
    pub dispute_count: u32,
    /// Unix seconds; present once a proposal exists.
    pub contest_deadline: Option<i64>,
    /// Unix seconds at which trading ends.
    pub resolution_time: i64,
    pub resolved: bool,
    pub cancelled: bool,
    pub winning_outcome: Option<u8>,
    pub proposed_outcome: Option<u8>,
}

impl ChainMarketAccount {
    /// An open, unresolved market ending at `resolution_time`.
    pub const fn open(resolution_time: i64) -> Self {
        Self {
            status: ChainMarketStatus::Open,
            dispute_count: 0,
            contest_deadline: None,
            resolution_time,
            resolved: false,
            cancelled: false,
            winning_outcome: None,
            proposed_outcome: None,
        }
    }

    /// The same market after its creator proposed `outcome`.
    #[must_use]
    pub const fn proposed(mut self, outcome: u8, contest_deadline: i64) -> Self {
        self.status = ChainMarketStatus::Proposed;
        self.proposed_outcome = Some(outcome);
        self.contest_deadline = Some(contest_deadline);
        self
    }
}
