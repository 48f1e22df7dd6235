//! Job Runner - One Reconciliation Invocation End to End
//!
//! Run flow:
//! 1. Authenticate the trigger (bearer token, constant-time compare)
//! 2. Take the job lease so two runs of one job never overlap
//! 3. Open a fresh chain client for this invocation
//! 4. Scan the index once
//! 5. Guard → submit/confirm → write back, one candidate at a time
//! 6. Release the lease and return the summary
//!
//! Every candidate runs inside its own failure boundary: errors and
//! panics become that candidate's result entry and the batch continues.
//!
//! A run is detached from its caller. Dropping the future returned by
//! `JobRunner::run` (client disconnect, host request limit) does not
//! cancel the batch: confirmed transactions are still written back and
//! the lease is still released.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::guard::EligibilityGuard;
use super::orchestrator::{submit_and_confirm, ConfirmPolicy};
use super::scanner::scan;
use super::writer::write_back;
use crate::config::{AppConfig, Secret};
use crate::domain::eligibility::Eligibility;
use crate::domain::error::{CandidateError, JobError};
use crate::domain::job::JobKind;
use crate::domain::market::IndexMarket;
use crate::domain::outcome::{CandidateResult, JobSummary};
use crate::ports::chain_client::{ChainClient, ChainConnector};
use crate::ports::clock::Clock;
use crate::ports::index::IndexRepository;
use crate::ports::lease::JobLease;
use crate::ports::observer::RunObserver;

/// Per-run tuning, resolved from configuration once at startup.
#[derive(Debug, Clone)]
pub struct JobSettings {
  /// Expected owner program of every market account.
  pub program_id: String,
  /// Bearer token expected on triggers.
  pub cron_secret: Secret,
  /// Maximum candidates per run.
  pub batch_limit: usize,
  pub confirm: ConfirmPolicy,
  /// Stop after the guard and submit nothing.
  pub dry_run: bool,
  pub lease_ttl: Duration,
}

impl JobSettings {
  pub fn from_config(config: &AppConfig) -> Self {
    Self {
      program_id: config.chain.program_id.clone(),
      cron_secret: config.jobs.shared_cron_secret.clone(),
      batch_limit: config.jobs.batch_limit,
      confirm: ConfirmPolicy {
        poll_interval: config.jobs.poll_interval(),
        timeout: config.jobs.confirmation_timeout(),
        max_retries: config.jobs.submit_max_retries,
      },
      dry_run: config.service.dry_run,
      lease_ttl: config.jobs.lease_ttl(),
    }
  }
}

/// External capabilities a runner needs.
#[derive(Clone)]
pub struct RunnerPorts {
  pub connector: Arc<dyn ChainConnector>,
  pub index: Arc<dyn IndexRepository>,
  pub lease: Arc<dyn JobLease>,
  pub clock: Arc<dyn Clock>,
  pub observer: Arc<dyn RunObserver>,
}

/// Executes reconciliation jobs on demand.
#[derive(Clone)]
pub struct JobRunner {
  ports: RunnerPorts,
  settings: JobSettings,
}

impl JobRunner {
  pub const fn new(ports: RunnerPorts, settings: JobSettings) -> Self {
    Self { ports, settings }
  }

  pub const fn settings(&self) -> &JobSettings {
    &self.settings
  }

  /// Run `kind` once for a trigger carrying `authorization`.
  ///
  /// The run executes on its own task and completes even if the
  /// returned future is dropped.
  ///
  /// # Errors
  /// Job-level failures only: bad credentials, a held lease, or a
  /// failed chain connection / index scan. Candidate failures are
  /// reported inside the summary.
  pub async fn run(&self, kind: JobKind, authorization: Option<&str>) -> Result<JobSummary, JobError> {
    let runner = self.clone();
    let authorization = authorization.map(str::to_owned);
    let task = tokio::spawn(async move { runner.run_to_completion(kind, authorization.as_deref()).await });

    match task.await {
      Ok(result) => result,
      Err(e) => {
        error!(job = kind.name(), error = %e, "Run task did not complete");
        Err(JobError::upstream(JobError::STEP_RUN, anyhow::anyhow!("run task failed: {e}")))
      }
    }
  }

  #[instrument(
    name = "job",
    skip(self, authorization),
    fields(job = kind.name(), run_id = %Uuid::new_v4())
  )]
  async fn run_to_completion(&self, kind: JobKind, authorization: Option<&str>) -> Result<JobSummary, JobError> {
    let result = self.authorized_run(kind, authorization).await;

    let step = match &result {
      Ok(summary) => {
        info!(
          count = summary.count,
          succeeded = summary.succeeded(),
          skipped = summary.skipped(),
          failed = summary.failed(),
          "Run complete"
        );
        JobSummary::STEP_COMPLETE
      }
      Err(e) => {
        warn!(step = e.step(), error = %e, "Run aborted");
        e.step()
      }
    };
    self
      .ports
      .observer
      .run_finished(kind, step, self.ports.clock.now().timestamp());

    result
  }

  async fn authorized_run(&self, kind: JobKind, authorization: Option<&str>) -> Result<JobSummary, JobError> {
    if !bearer_matches(authorization, self.settings.cron_secret.expose()) {
      return Err(JobError::Auth);
    }

    let token = self
      .ports
      .lease
      .try_acquire(kind.name(), self.settings.lease_ttl)
      .await
      .map_err(|e| JobError::upstream(JobError::STEP_LEASE, e))?
      .ok_or_else(|| JobError::LeaseHeld {
        job: kind.name().to_string(),
      })?;

    let result = self.leased_run(kind).await;

    if let Err(e) = self.ports.lease.release(&token).await {
      warn!(error = %e, "Failed to release job lease, it will expire");
    }
    result
  }

  async fn leased_run(&self, kind: JobKind) -> Result<JobSummary, JobError> {
    let chain = self
      .ports
      .connector
      .connect()
      .await
      .map_err(|e| JobError::upstream(JobError::STEP_CHAIN_INIT, e))?;

    let candidates = scan(
      self.ports.index.as_ref(),
      kind,
      self.ports.clock.now(),
      self.settings.batch_limit,
    )
    .await
    .map_err(|e| JobError::upstream(JobError::STEP_SCAN, e))?;

    info!(
      candidates = candidates.len(),
      signer = %chain.signer_address(),
      dry_run = self.settings.dry_run,
      "Processing candidates"
    );

    let mut results = Vec::with_capacity(candidates.len());
    for row in &candidates {
      let result = AssertUnwindSafe(self.process(chain.as_ref(), kind, row))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
          let message = panic_message(panic.as_ref());
          error!(market = %row.address, panic = %message, "Candidate pipeline panicked");
          CandidateResult::failed(row.address.as_str(), &CandidateError::Panicked(message))
        });

      self.ports.observer.candidate_finished(kind, &result);
      results.push(result);
    }

    Ok(JobSummary::complete(results))
  }

  /// Guard, submit, confirm and write back a single candidate.
  #[instrument(skip(self, chain, row), fields(market = %row.address))]
  async fn process(&self, chain: &dyn ChainClient, kind: JobKind, row: &IndexMarket) -> CandidateResult {
    let guard = EligibilityGuard::new(chain, &self.settings.program_id, kind.rule());
    let now_unix = self.ports.clock.now().timestamp();

    let account = match guard.check(&row.address, now_unix).await {
      Ok(Eligibility::Proceed { account }) => account,
      Ok(Eligibility::Skip { reason, diagnostics }) => {
        info!(%reason, "Candidate skipped");
        return CandidateResult::skipped(row.address.as_str(), reason, diagnostics);
      }
      Err(e) => {
        warn!(error = %e, "Guard failed");
        return CandidateResult::failed(row.address.as_str(), &e);
      }
    };

    if self.settings.dry_run {
      info!("Eligible (dry run, nothing submitted)");
      return CandidateResult::dry_run(row.address.as_str());
    }

    let started = Instant::now();
    let outcome = submit_and_confirm(chain, kind, &row.address, self.settings.confirm).await;
    let label = outcome.label();
    let signature = match outcome.into_confirmed() {
      Ok(signature) => signature,
      Err(e) => {
        warn!(outcome = label, error = %e, "Transaction not confirmed");
        return CandidateResult::failed(row.address.as_str(), &e);
      }
    };
    self.ports.observer.confirmation_latency(kind, started.elapsed());

    match write_back(
      self.ports.index.as_ref(),
      kind,
      row,
      &account,
      signature,
      self.ports.clock.now(),
    )
    .await
    {
      Ok(signature) => CandidateResult::succeeded(row.address.as_str(), signature),
      Err(e) => CandidateResult::failed(row.address.as_str(), &e),
    }
  }
}

/// `Authorization: Bearer <secret>`, compared in constant time.
fn bearer_matches(header: Option<&str>, secret: &str) -> bool {
  if secret.is_empty() {
    return false;
  }
  header
    .and_then(|h| h.strip_prefix("Bearer "))
    .is_some_and(|token| constant_time_eq(token.as_bytes(), secret.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
  if a.len() != b.len() {
    return false;
  }
  a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  panic
    .downcast_ref::<&str>()
    .map(ToString::to_string)
    .or_else(|| panic.downcast_ref::<String>().cloned())
    .unwrap_or_else(|| "unknown panic".to_string())
}
