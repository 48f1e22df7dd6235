//! Service Signer Loading
//!
//! Accepts the 64-byte ed25519 secret key either base58-encoded
//! (Phantom/`solana-keygen` export) or as a JSON byte array
//! (`id.json` format).

use anyhow::{Context, Result};
use solana_sdk::signature::Keypair;

const KEYPAIR_LEN: usize = 64;

/// Parse a service signer from its configured secret.
///
/// # Errors
/// Fails when the secret is neither valid base58 nor a JSON array,
/// or does not decode to exactly 64 bytes.
pub fn parse_keypair(secret: &str) -> Result<Keypair> {
    let secret = secret.trim();
    let bytes = if secret.starts_with('[') {
        serde_json::from_str::<Vec<u8>>(secret)
            .context("Signer secret is not a JSON byte array")?
    } else {
        bs58::decode(secret)
            .into_vec()
            .context("Signer secret is not valid base58")?
    };

    anyhow::ensure!(
        bytes.len() == KEYPAIR_LEN,
        "Signer secret must be {KEYPAIR_LEN} bytes, got {}",
        bytes.len()
    );

    Keypair::from_bytes(&bytes).context("Signer secret is not a valid ed25519 keypair")
}
