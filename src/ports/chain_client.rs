//! Chain Client Port - On-chain Interaction Interface
//!
//! Defines the typed capability the reconciler consumes from the
//! market program: raw account fetch, canonical market decoding,
//! instruction construction, sign + submit, and signature status
//! queries. Implementations are created per job invocation by a
//! `ChainConnector`, so no connection or signer outlives a run.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::DecodeError;
use crate::domain::job::JobKind;
use crate::domain::market::{ChainMarketAccount, TxSignature};

/// Raw account as returned by the RPC node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccount {
  /// Base58 id of the program that owns the account.
  pub owner: String,
  /// Account data, including the 8-byte Anchor discriminator.
  pub data: Vec<u8>,
}

/// Account reference inside an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef {
  pub address: String,
  pub is_signer: bool,
  pub is_writable: bool,
}

/// Unsigned instruction ready to be signed by the service signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
  /// Program the instruction targets.
  pub program_id: String,
  /// Anchor instruction name (e.g. `finalize_if_no_disputes`).
  pub instruction: &'static str,
  /// Ordered accounts: market (writable), then the signer as `user`.
  pub accounts: Vec<AccountRef>,
  /// Serialized instruction data (discriminator + args).
  pub data: Vec<u8>,
  /// Fee payer; always the service signer.
  pub fee_payer: String,
}

/// Submission options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
  /// Run preflight simulation before broadcasting.
  pub preflight: bool,
  /// Bounded RPC-side rebroadcast count.
  pub max_retries: usize,
}

impl Default for SubmitOptions {
  fn default() -> Self {
    Self {
      preflight: true,
      max_retries: 3,
    }
  }
}

/// Observed status of a submitted signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
  /// Not yet seen, or seen below `confirmed` commitment.
  Pending,
  Confirmed,
  Finalized,
  /// Landed with a program/runtime error.
  Failed(String),
}

impl SignatureStatus {
  /// Whether polling can stop.
  pub const fn is_terminal(&self) -> bool {
    !matches!(self, Self::Pending)
  }
}

/// Typed access to the market program.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
  /// Fetch an account; `None` when no account exists at `address`.
  async fn get_account(&self, address: &str) -> anyhow::Result<Option<RawAccount>>;

  /// Decode raw market account bytes into the canonical struct.
  fn decode_market(&self, data: &[u8]) -> Result<ChainMarketAccount, DecodeError>;

  /// Build the job's instruction for `market`, authorized by the service signer.
  async fn build_instruction(&self, kind: JobKind, market: &str) -> anyhow::Result<UnsignedTx>;

  /// Set fee payer + latest blockhash, sign, and submit. Returns the signature.
  async fn sign_and_submit(
    &self,
    tx: &UnsignedTx,
    options: SubmitOptions,
  ) -> anyhow::Result<TxSignature>;

  /// Query the current status of a submitted signature.
  async fn signature_status(&self, signature: &str) -> anyhow::Result<SignatureStatus>;

  /// Base58 address of the service signer.
  fn signer_address(&self) -> String;
}

/// Creates a fresh chain client for each job invocation.
#[async_trait]
pub trait ChainConnector: Send + Sync + 'static {
  /// Open a connection and load the signer. Failure aborts the job.
  async fn connect(&self) -> anyhow::Result<Arc<dyn ChainClient>>;
}
