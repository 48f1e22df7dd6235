//! Configuration Loader - File Loading, Env Overrides and Validation
//!
//! Handles loading `config.toml`, overlaying secrets from environment
//! variables, validating all parameters, and providing clear error
//! messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::{AppConfig, Secret};

/// Bearer token expected on trigger requests.
pub const ENV_CRON_SECRET: &str = "CRON_SECRET";
/// Base58 (or JSON array) service signer key.
pub const ENV_SIGNER_SECRET: &str = "CRON_SIGNER_SECRET_KEY_B58";
/// PostgREST service-role key.
pub const ENV_INDEX_SERVICE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
/// Optional RPC endpoint override.
pub const ENV_RPC_ENDPOINT: &str = "SOLANA_RPC";
/// Optional index URL override.
pub const ENV_INDEX_URL: &str = "SUPABASE_URL";

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated (including missing secrets)
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content, |key| std::env::var(key).ok())?;

  info!(
    program_id = %config.chain.program_id,
    batch_limit = config.jobs.batch_limit,
    confirmation_timeout_ms = config.jobs.confirmation_timeout_ms,
    dry_run = config.service.dry_run,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse TOML, apply overrides from `env`, and validate.
pub fn parse_config<F>(content: &str, env: F) -> Result<AppConfig>
where
  F: Fn(&str) -> Option<String>,
{
  let mut config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  apply_env_overrides(&mut config, env);
  validate_config(&config)?;
  Ok(config)
}

fn apply_env_overrides<F>(config: &mut AppConfig, env: F)
where
  F: Fn(&str) -> Option<String>,
{
  let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

  if let Some(v) = non_empty(ENV_CRON_SECRET) {
    config.jobs.shared_cron_secret = Secret::new(v);
  }
  if let Some(v) = non_empty(ENV_SIGNER_SECRET) {
    config.chain.service_signer_secret = Secret::new(v);
  }
  if let Some(v) = non_empty(ENV_INDEX_SERVICE_KEY) {
    config.index.service_key = Secret::new(v);
  }
  if let Some(v) = non_empty(ENV_RPC_ENDPOINT) {
    config.chain.rpc_endpoint = v;
  }
  if let Some(v) = non_empty(ENV_INDEX_URL) {
    config.index.url = v;
  }
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-empty endpoints, program id and table
/// - Presence of every secret
/// - Positive batch/timeout values and a poll interval below the timeout
fn validate_config(config: &AppConfig) -> Result<()> {
  // Chain validation
  anyhow::ensure!(
    !config.chain.program_id.trim().is_empty(),
    "chain.program_id must not be empty"
  );
  anyhow::ensure!(
    bs58::decode(&config.chain.program_id)
      .into_vec()
      .is_ok_and(|bytes| bytes.len() == 32),
    "chain.program_id is not a base58 public key: {}",
    config.chain.program_id
  );
  anyhow::ensure!(
    !config.chain.rpc_endpoint.is_empty(),
    "chain.rpc_endpoint must not be empty"
  );
  anyhow::ensure!(
    !config.chain.service_signer_secret.is_empty(),
    "service signer secret missing (set {ENV_SIGNER_SECRET})"
  );

  // Index validation
  anyhow::ensure!(!config.index.url.is_empty(), "index.url must not be empty");
  anyhow::ensure!(
    !config.index.table.is_empty(),
    "index.table must not be empty"
  );
  anyhow::ensure!(
    !config.index.service_key.is_empty(),
    "index service key missing (set {ENV_INDEX_SERVICE_KEY})"
  );

  // Job validation
  anyhow::ensure!(
    !config.jobs.shared_cron_secret.is_empty(),
    "cron secret missing (set {ENV_CRON_SECRET})"
  );
  anyhow::ensure!(
    config.jobs.batch_limit > 0 && config.jobs.batch_limit <= 1000,
    "jobs.batch_limit must be in (0, 1000], got {}",
    config.jobs.batch_limit
  );
  anyhow::ensure!(
    config.jobs.confirmation_timeout_ms > 0,
    "jobs.confirmation_timeout_ms must be positive"
  );
  anyhow::ensure!(
    config.jobs.poll_interval_ms > 0
      && config.jobs.poll_interval_ms < config.jobs.confirmation_timeout_ms,
    "jobs.poll_interval_ms must be in (0, confirmation_timeout_ms), got {}",
    config.jobs.poll_interval_ms
  );

  Ok(())
}
