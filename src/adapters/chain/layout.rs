//! Market Account Layout - Canonical Anchor Decoder
//!
//! The single place where raw market account bytes are interpreted.
//! Layout (after the 8-byte Anchor discriminator):
//! `creator, resolution_time, market_type, outcome_count, b_lamports,
//! q[10], status, resolved, cancelled, winning_outcome, proposed_outcome,
//! proposed_at, contest_deadline, dispute_count, ...`.
//! Fields after `dispute_count` are irrelevant to reconciliation and
//! are not read.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::hash::hash;

use crate::domain::error::DecodeError;
use crate::domain::market::{ChainMarketAccount, ChainMarketStatus};

/// Number of outcome slots in the on-chain `q` array.
pub const MAX_OUTCOMES: usize = 10;

const DISCRIMINATOR_LEN: usize = 8;

/// On-chain dispute window after a proposal (4h).
const PROPOSAL_DISPUTE_WINDOW_SECS: i64 = 4 * 3600;

/// Anchor account discriminator: `sha256("account:<Name>")[..8]`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    discriminator(&format!("account:{name}"))
}

/// Anchor instruction discriminator: `sha256("global:<name>")[..8]`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    discriminator(&format!("global:{name}"))
}

fn discriminator(preimage: &str) -> [u8; 8] {
    let digest = hash(preimage.as_bytes()).to_bytes();
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

#[derive(Debug, Clone, Copy, BorshSerialize, BorshDeserialize)]
enum StatusLayout {
    Open,
    Proposed,
    Finalized,
    Cancelled,
}

impl From<StatusLayout> for ChainMarketStatus {
    fn from(s: StatusLayout) -> Self {
        match s {
            StatusLayout::Open => Self::Open,
            StatusLayout::Proposed => Self::Proposed,
            StatusLayout::Finalized => Self::Finalized,
            StatusLayout::Cancelled => Self::Cancelled,
        }
    }
}

impl From<ChainMarketStatus> for StatusLayout {
    fn from(s: ChainMarketStatus) -> Self {
        match s {
            ChainMarketStatus::Open => Self::Open,
            ChainMarketStatus::Proposed => Self::Proposed,
            ChainMarketStatus::Finalized => Self::Finalized,
            ChainMarketStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// Leading prefix of the on-chain `Market` account.
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
struct MarketLayout {
    creator: [u8; 32],
    resolution_time: i64,
    market_type: u8,
    outcome_count: u8,
    b_lamports: u64,
    q: [u64; MAX_OUTCOMES],
    status: StatusLayout,
    resolved: bool,
    cancelled: bool,
    winning_outcome: Option<u8>,
    proposed_outcome: Option<u8>,
    proposed_at: Option<i64>,
    contest_deadline: Option<i64>,
    dispute_count: u32,
}

/// Decode a market account into its canonical form.
///
/// # Errors
/// Fails on short data, a foreign discriminator, or malformed fields.
pub fn decode_market_account(data: &[u8]) -> Result<ChainMarketAccount, DecodeError> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(DecodeError::TooShort { len: data.len() });
    }
    let (disc, mut body) = data.split_at(DISCRIMINATOR_LEN);
    if disc != account_discriminator("Market") {
        return Err(DecodeError::Discriminator);
    }

    let raw = MarketLayout::deserialize(&mut body)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    Ok(ChainMarketAccount {
        status: raw.status.into(),
        dispute_count: raw.dispute_count,
        contest_deadline: raw.contest_deadline,
        resolution_time: raw.resolution_time,
        resolved: raw.resolved,
        cancelled: raw.cancelled,
        winning_outcome: raw.winning_outcome,
        proposed_outcome: raw.proposed_outcome,
    })
}

/// Serialize a canonical account back into the on-chain layout.
///
/// Fields the canonical form does not carry are zeroed. Used to seed
/// local validators and test fixtures with realistic account bytes.
pub fn encode_market_account(account: &ChainMarketAccount) -> Vec<u8> {
    let layout = MarketLayout {
        creator: [0u8; 32],
        resolution_time: account.resolution_time,
        market_type: 0,
        outcome_count: 2,
        b_lamports: 0,
        q: [0u64; MAX_OUTCOMES],
        status: account.status.into(),
        resolved: account.resolved,
        cancelled: account.cancelled,
        winning_outcome: account.winning_outcome,
        proposed_outcome: account.proposed_outcome,
        proposed_at: account.contest_deadline.map(|d| d - PROPOSAL_DISPUTE_WINDOW_SECS),
        contest_deadline: account.contest_deadline,
        dispute_count: account.dispute_count,
    };

    let mut out = account_discriminator("Market").to_vec();
    // Vec<u8> writes are infallible.
    borsh::to_writer(&mut out, &layout).unwrap_or_default();
    out
}
