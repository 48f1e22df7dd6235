//! Solana Connector - Per-run RPC Connection and Startup Validation
//!
//! Builds a fresh `RpcClient` and loads the service signer on every
//! job invocation so nothing outlives a run. Connectivity is checked
//! with `getVersion` before the client is handed to the job.
//!
//! `validate_program` runs once at startup and verifies that the
//! configured program id points to a deployed executable, which
//! surfaces configuration mistakes before the first trigger arrives.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use tracing::{info, instrument, warn};

use super::rpc::SolanaChainClient;
use super::signer::parse_keypair;
use crate::config::{ChainConfig, Secret};
use crate::ports::chain_client::{ChainClient, ChainConnector};

/// Result of the startup program check.
#[derive(Debug)]
pub struct ProgramCheck {
    /// Program id that was validated.
    pub program_id: String,
    /// Whether an account exists at the program id.
    pub exists: bool,
    /// Whether that account is executable.
    pub executable: bool,
}

impl ProgramCheck {
    pub const fn is_deployed(&self) -> bool {
        self.exists && self.executable
    }
}

/// Opens chain clients for the configured cluster and program.
pub struct SolanaConnector {
    rpc_endpoint: String,
    program_id: Pubkey,
    signer_secret: Secret,
}

impl SolanaConnector {
    /// Create a connector from config. Does not touch the network.
    ///
    /// # Errors
    /// Fails when the configured program id is not a public key.
    pub fn new(config: &ChainConfig) -> Result<Self> {
        let program_id = Pubkey::from_str(&config.program_id)
            .with_context(|| format!("Invalid program id: {}", config.program_id))?;

        Ok(Self {
            rpc_endpoint: config.rpc_endpoint.clone(),
            program_id,
            signer_secret: config.service_signer_secret.clone(),
        })
    }

    fn rpc(&self) -> RpcClient {
        RpcClient::new_with_commitment(self.rpc_endpoint.clone(), CommitmentConfig::confirmed())
    }

    /// Check that the program id is a deployed executable.
    #[instrument(skip(self), fields(program_id = %self.program_id))]
    pub async fn validate_program(&self) -> Result<ProgramCheck> {
        let response = self
            .rpc()
            .get_account_with_commitment(&self.program_id, CommitmentConfig::confirmed())
            .await
            .context("Failed to query program account")?;

        let check = ProgramCheck {
            program_id: self.program_id.to_string(),
            exists: response.value.is_some(),
            executable: response.value.as_ref().is_some_and(|a| a.executable),
        };

        if check.is_deployed() {
            info!("Program validated: executable account exists on-chain");
        } else {
            warn!(
                exists = check.exists,
                executable = check.executable,
                "Program account is not a deployed executable, possible misconfiguration"
            );
        }

        Ok(check)
    }
}

#[async_trait]
impl ChainConnector for SolanaConnector {
    #[instrument(skip(self))]
    async fn connect(&self) -> Result<Arc<dyn ChainClient>> {
        let signer = parse_keypair(self.signer_secret.expose())
            .context("Failed to load service signer")?;

        let rpc = self.rpc();
        let version = rpc
            .get_version()
            .await
            .context("Solana RPC endpoint unreachable")?;

        info!(
            solana_core = %version.solana_core,
            signer = %signer.pubkey(),
            "Connected to Solana RPC"
        );

        Ok(Arc::new(SolanaChainClient::new(rpc, signer, self.program_id)))
    }
}
