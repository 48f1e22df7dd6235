//! Resolution Reconciler - Entry Point
//!
//! Wires configuration, logging, adapters and the job runner, then
//! serves the trigger endpoints until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config (path from `RECONCILER_CONFIG`, default `config.toml`)
//! 2. Init tracing (JSON structured logging)
//! 3. Create metrics registry and health state
//! 4. Create Solana connector and validate the program id on-chain
//! 5. Create PostgREST index client and in-process job lease
//! 6. Build the job runner
//! 7. Serve triggers, probes and metrics until shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use resolution_reconciler::adapters::chain::SolanaConnector;
use resolution_reconciler::adapters::http::{self, AppState};
use resolution_reconciler::adapters::index::PostgrestIndex;
use resolution_reconciler::adapters::lease::InMemoryLease;
use resolution_reconciler::adapters::metrics::{HealthState, ReconcilerMetrics};
use resolution_reconciler::config;
use resolution_reconciler::ports::clock::SystemClock;
use resolution_reconciler::usecases::{JobRunner, JobSettings, RunnerPorts};

const CONFIG_PATH_ENV: &str = "RECONCILER_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        program_id = %config.chain.program_id,
        dry_run = config.service.dry_run,
        "Starting resolution reconciler"
    );
    if config.service.dry_run {
        warn!("Dry-run mode: eligible markets are reported, nothing is submitted");
    }

    // ── 3. Observability ────────────────────────────────────
    let metrics = Arc::new(ReconcilerMetrics::new().context("Failed to register metrics")?);
    let health = HealthState::new();

    // ── 4. Chain connector + startup program check ──────────
    let connector = SolanaConnector::new(&config.chain).context("Invalid chain configuration")?;
    match connector.validate_program().await {
        Ok(check) if !check.is_deployed() => {
            warn!(program_id = %check.program_id, "Configured program is not deployed on this cluster");
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Program validation skipped, RPC unavailable"),
    }

    // ── 5. Index + lease ────────────────────────────────────
    let index = PostgrestIndex::new(&config.index).context("Failed to create index client")?;

    // ── 6. Job runner ───────────────────────────────────────
    let ports = RunnerPorts {
        connector: Arc::new(connector),
        index: Arc::new(index),
        lease: Arc::new(InMemoryLease::new()),
        clock: Arc::new(SystemClock),
        observer: metrics.clone(),
    };
    let runner = JobRunner::new(ports, JobSettings::from_config(&config));

    let state = Arc::new(AppState {
        runner,
        metrics,
        health: health.clone(),
    });

    // ── 7. Serve until SIGINT/SIGTERM ───────────────────────
    let shutdown = async move {
        shutdown_signal().await;
        info!("Shutdown signal received, draining in-flight runs");
        health.begin_shutdown();
    };
    http::serve(state, &config.service.bind_address, shutdown).await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
