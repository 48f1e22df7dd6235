//! Solana Chain Client - Nonblocking RPC Implementation
//!
//! Implements `ChainClient` over `solana-client`'s nonblocking
//! `RpcClient`. All reads use `confirmed` commitment. Submission signs
//! with the service keypair, runs preflight, and bounds RPC-side
//! rebroadcasts; a duplicate submission that the cluster reports as
//! already processed is recovered into the locally computed signature.

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use tracing::{debug, instrument, warn};

use super::layout::{decode_market_account, instruction_discriminator};
use crate::domain::error::DecodeError;
use crate::domain::job::JobKind;
use crate::domain::market::{ChainMarketAccount, TxSignature};
use crate::ports::chain_client::{
    AccountRef, ChainClient, RawAccount, SignatureStatus, SubmitOptions, UnsignedTx,
};

/// Chain client bound to one RPC connection and one signer.
pub struct SolanaChainClient {
    rpc: RpcClient,
    signer: Keypair,
    program_id: Pubkey,
    commitment: CommitmentConfig,
}

impl SolanaChainClient {
    pub fn new(rpc: RpcClient, signer: Keypair, program_id: Pubkey) -> Self {
        Self {
            rpc,
            signer,
            program_id,
            commitment: CommitmentConfig::confirmed(),
        }
    }

    fn to_instruction(tx: &UnsignedTx) -> Result<Instruction> {
        let program_id = parse_pubkey(&tx.program_id)?;
        let accounts = tx
            .accounts
            .iter()
            .map(|a| {
                let pubkey = parse_pubkey(&a.address)?;
                Ok(if a.is_writable {
                    AccountMeta::new(pubkey, a.is_signer)
                } else {
                    AccountMeta::new_readonly(pubkey, a.is_signer)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Instruction {
            program_id,
            accounts,
            data: tx.data.clone(),
        })
    }
}

fn parse_pubkey(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address).with_context(|| format!("Invalid public key: {address}"))
}

/// Whether a submission error means the transaction already landed.
pub fn is_already_processed(error: &str) -> bool {
    let lower = error.to_ascii_lowercase();
    lower.contains("already been processed") || lower.contains("alreadyprocessed")
}

#[async_trait]
impl ChainClient for SolanaChainClient {
    #[instrument(skip(self))]
    async fn get_account(&self, address: &str) -> Result<Option<RawAccount>> {
        let pubkey = parse_pubkey(address)?;
        let response = self
            .rpc
            .get_account_with_commitment(&pubkey, self.commitment)
            .await
            .with_context(|| format!("getAccountInfo failed for {address}"))?;

        Ok(response.value.map(|account| RawAccount {
            owner: account.owner.to_string(),
            data: account.data,
        }))
    }

    fn decode_market(&self, data: &[u8]) -> Result<ChainMarketAccount, DecodeError> {
        decode_market_account(data)
    }

    async fn build_instruction(&self, kind: JobKind, market: &str) -> Result<UnsignedTx> {
        let market = parse_pubkey(market)?;
        let user = self.signer.pubkey();

        Ok(UnsignedTx {
            program_id: self.program_id.to_string(),
            instruction: kind.instruction(),
            accounts: vec![
                AccountRef {
                    address: market.to_string(),
                    is_signer: false,
                    is_writable: true,
                },
                AccountRef {
                    address: user.to_string(),
                    is_signer: true,
                    is_writable: true,
                },
            ],
            data: instruction_discriminator(kind.instruction()).to_vec(),
            fee_payer: user.to_string(),
        })
    }

    #[instrument(skip(self, tx), fields(instruction = tx.instruction))]
    async fn sign_and_submit(&self, tx: &UnsignedTx, options: SubmitOptions) -> Result<TxSignature> {
        let payer = parse_pubkey(&tx.fee_payer)?;
        anyhow::ensure!(
            payer == self.signer.pubkey(),
            "Fee payer {payer} is not the service signer"
        );

        let instruction = Self::to_instruction(tx)?;
        let (blockhash, _) = self
            .rpc
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .context("Failed to fetch latest blockhash")?;

        let mut transaction = Transaction::new_with_payer(&[instruction], Some(&payer));
        transaction
            .try_sign(&[&self.signer], blockhash)
            .context("Failed to sign transaction")?;
        let local_signature = transaction
            .signatures
            .first()
            .copied()
            .context("Signed transaction carries no signature")?;

        let config = RpcSendTransactionConfig {
            skip_preflight: !options.preflight,
            preflight_commitment: Some(self.commitment.commitment),
            max_retries: Some(options.max_retries),
            ..RpcSendTransactionConfig::default()
        };

        match self.rpc.send_transaction_with_config(&transaction, config).await {
            Ok(signature) => {
                debug!(%signature, "Transaction submitted");
                Ok(signature.to_string())
            }
            Err(e) if is_already_processed(&e.to_string()) => {
                warn!(
                    signature = %local_signature,
                    "Transaction already processed, continuing with local signature"
                );
                Ok(local_signature.to_string())
            }
            Err(e) => Err(anyhow::Error::new(e).context("sendTransaction failed")),
        }
    }

    async fn signature_status(&self, signature: &str) -> Result<SignatureStatus> {
        let signature = Signature::from_str(signature)
            .with_context(|| format!("Invalid signature: {signature}"))?;
        let statuses = self
            .rpc
            .get_signature_statuses(&[signature])
            .await
            .context("getSignatureStatuses failed")?
            .value;

        let Some(status) = statuses.into_iter().next().flatten() else {
            return Ok(SignatureStatus::Pending);
        };

        Ok(if let Some(err) = status.err {
            SignatureStatus::Failed(err.to_string())
        } else if status.satisfies_commitment(CommitmentConfig::finalized()) {
            SignatureStatus::Finalized
        } else if status.satisfies_commitment(CommitmentConfig::confirmed()) {
            SignatureStatus::Confirmed
        } else {
            SignatureStatus::Pending
        })
    }

    fn signer_address(&self) -> String {
        self.signer.pubkey().to_string()
    }
}
