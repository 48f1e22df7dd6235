//! Prometheus Metrics Registry - Reconciliation Observability
//!
//! Counts runs, candidate outcomes, skip reasons and failure reasons
//! per job, and tracks confirmation latency. Rendered as Prometheus
//! text on `/metrics`.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::domain::job::JobKind;
use crate::domain::outcome::{CandidateResult, JobSummary};
use crate::ports::observer::RunObserver;

/// Centralized Prometheus metrics for the reconciler.
///
/// All metrics follow the naming convention `reconciler_*` and carry
/// a `job` label.
pub struct ReconcilerMetrics {
    registry: Registry,
    /// Runs by terminal step (`complete`, `auth`, `lease`, ...).
    pub runs: IntCounterVec,
    /// Candidates by outcome (`succeeded`, `skipped`, `failed`, `dry_run`).
    pub candidates: IntCounterVec,
    /// Skipped candidates by reason.
    pub skips: IntCounterVec,
    /// Failed candidates by reason.
    pub failures: IntCounterVec,
    /// Submit-to-confirmation latency in seconds.
    pub confirmation_seconds: HistogramVec,
    /// Unix time of the last completed run.
    pub last_run_unix: IntGaugeVec,
}

impl ReconcilerMetrics {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let runs = IntCounterVec::new(
            Opts::new("reconciler_runs_total", "Job invocations by terminal step"),
            &["job", "step"],
        )?;

        let candidates = IntCounterVec::new(
            Opts::new("reconciler_candidates_total", "Processed candidates by outcome"),
            &["job", "outcome"],
        )?;

        let skips = IntCounterVec::new(
            Opts::new("reconciler_skips_total", "Skipped candidates by reason"),
            &["job", "reason"],
        )?;

        let failures = IntCounterVec::new(
            Opts::new("reconciler_failures_total", "Failed candidates by reason"),
            &["job", "reason"],
        )?;

        let confirmation_seconds = HistogramVec::new(
            HistogramOpts::new(
                "reconciler_confirmation_seconds",
                "Time from submission to confirmed commitment",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 45.0, 90.0]),
            &["job"],
        )?;

        let last_run_unix = IntGaugeVec::new(
            Opts::new("reconciler_last_run_unix", "Unix time of the last completed run"),
            &["job"],
        )?;

        registry.register(Box::new(runs.clone()))?;
        registry.register(Box::new(candidates.clone()))?;
        registry.register(Box::new(skips.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(confirmation_seconds.clone()))?;
        registry.register(Box::new(last_run_unix.clone()))?;

        Ok(Self {
            registry,
            runs,
            candidates,
            skips,
            failures,
            confirmation_seconds,
            last_run_unix,
        })
    }

    pub fn record_run(&self, kind: JobKind, step: &str) {
        self.runs.with_label_values(&[kind.name(), step]).inc();
    }

    /// Count one candidate result under its outcome and reason.
    pub fn record_candidate(&self, kind: JobKind, result: &CandidateResult) {
        let job = kind.name();
        let reason = result.reason.as_deref().unwrap_or("unknown");

        let outcome = if !result.ok {
            self.failures.with_label_values(&[job, reason]).inc();
            "failed"
        } else if result.skip && reason == CandidateResult::DRY_RUN {
            "dry_run"
        } else if result.skip {
            self.skips.with_label_values(&[job, reason]).inc();
            "skipped"
        } else {
            "succeeded"
        };
        self.candidates.with_label_values(&[job, outcome]).inc();
    }

    pub fn observe_confirmation(&self, kind: JobKind, seconds: f64) {
        self.confirmation_seconds
            .with_label_values(&[kind.name()])
            .observe(seconds);
    }

    pub fn mark_completed(&self, kind: JobKind, unix: i64) {
        self.last_run_unix.with_label_values(&[kind.name()]).set(unix);
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl RunObserver for ReconcilerMetrics {
    fn run_finished(&self, kind: JobKind, step: &str, finished_unix: i64) {
        self.record_run(kind, step);
        if step == JobSummary::STEP_COMPLETE {
            self.mark_completed(kind, finished_unix);
        }
    }

    fn candidate_finished(&self, kind: JobKind, result: &CandidateResult) {
        self.record_candidate(kind, result);
    }

    fn confirmation_latency(&self, kind: JobKind, elapsed: Duration) {
        self.observe_confirmation(kind, elapsed.as_secs_f64());
    }
}
