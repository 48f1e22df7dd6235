//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Secrets
//! (cron bearer token, signer key, index service key) are normally
//! supplied through environment variables, which override the file.
//! The program id and every endpoint are externalized here - nothing
//! is hardcoded in the domain layer.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity, logging and HTTP binding.
  pub service: ServiceConfig,
  /// Chain program and RPC settings.
  pub chain: ChainConfig,
  /// Off-chain index (PostgREST) settings.
  pub index: IndexConfig,
  /// Reconciliation job tuning.
  #[serde(default)]
  pub jobs: JobsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Trigger/health/metrics server bind address.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
  /// Stop after the guard: report eligible markets, submit nothing.
  #[serde(default)]
  pub dry_run: bool,
}

/// Chain configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
  /// Expected owner program of every market account.
  pub program_id: String,
  /// Solana JSON-RPC endpoint.
  pub rpc_endpoint: String,
  /// 64-byte service signer key, base58 or JSON byte array.
  #[serde(default)]
  pub service_signer_secret: Secret,
}

/// Index configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
  /// PostgREST base URL (e.g. `https://xyz.supabase.co`).
  pub url: String,
  /// Table holding the market rows.
  #[serde(default = "default_table")]
  pub table: String,
  /// Service-role key sent as `apikey` and bearer token.
  #[serde(default)]
  pub service_key: Secret,
  /// Request timeout in milliseconds.
  #[serde(default = "default_index_timeout_ms")]
  pub timeout_ms: u64,
}

/// Reconciliation job configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
  /// Bearer token expected on trigger requests.
  #[serde(default)]
  pub shared_cron_secret: Secret,
  /// Maximum candidates per run.
  #[serde(default = "default_batch_limit")]
  pub batch_limit: usize,
  /// Hard per-candidate confirmation timeout (milliseconds).
  #[serde(default = "default_confirmation_timeout_ms")]
  pub confirmation_timeout_ms: u64,
  /// Signature status poll interval (milliseconds).
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
  /// RPC-side rebroadcast count on submission.
  #[serde(default = "default_submit_max_retries")]
  pub submit_max_retries: usize,
  /// Lease TTL; defaults to the worst-case run time plus a margin.
  #[serde(default)]
  pub lease_ttl_ms: Option<u64>,
}

impl Default for JobsConfig {
  fn default() -> Self {
    Self {
      shared_cron_secret: Secret::default(),
      batch_limit: default_batch_limit(),
      confirmation_timeout_ms: default_confirmation_timeout_ms(),
      poll_interval_ms: default_poll_interval_ms(),
      submit_max_retries: default_submit_max_retries(),
      lease_ttl_ms: None,
    }
  }
}

impl JobsConfig {
  pub const fn confirmation_timeout(&self) -> Duration {
    Duration::from_millis(self.confirmation_timeout_ms)
  }

  pub const fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  /// `batch_limit × confirmation_timeout + 60s` unless set explicitly.
  pub fn lease_ttl(&self) -> Duration {
    self.lease_ttl_ms.map_or_else(
      || {
        let worst = self
          .confirmation_timeout_ms
          .saturating_mul(self.batch_limit as u64);
        Duration::from_millis(worst.saturating_add(LEASE_MARGIN_MS))
      },
      Duration::from_millis,
    )
  }
}

/// Margin added on top of the worst-case run time for the default lease TTL.
const LEASE_MARGIN_MS: u64 = 60_000;

/// Secret string that never appears in `Debug` output or logs.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  pub fn expose(&self) -> &str {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.trim().is_empty()
  }
}

impl std::fmt::Debug for Secret {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.0.is_empty() {
      f.write_str("Secret(<unset>)")
    } else {
      f.write_str("Secret(<redacted>)")
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "resolution-reconciler".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_bind_address() -> String {
  "0.0.0.0:8080".to_string()
}

fn default_table() -> String {
  "markets".to_string()
}

const fn default_index_timeout_ms() -> u64 {
  15_000
}

const fn default_batch_limit() -> usize {
  50
}

const fn default_confirmation_timeout_ms() -> u64 {
  90_000
}

const fn default_poll_interval_ms() -> u64 {
  1_200
}

const fn default_submit_max_retries() -> usize {
  3
}
