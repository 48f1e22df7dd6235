//! Integration Tests - Reconciliation Runs End to End
//!
//! Drives `JobRunner` against hand-written fakes holding real Anchor
//! account bytes. Covers the finalize and cancel paths, every guard
//! skip, transaction failure modes, run-level errors and telemetry.

mod support;

use std::sync::atomic::Ordering;
use std::time::Duration;

use resolution_reconciler::domain::error::JobError;
use resolution_reconciler::domain::job::JobKind;
use resolution_reconciler::domain::market::{ChainMarketAccount, IndexMarket, ResolutionStatus};
use resolution_reconciler::ports::chain_client::RawAccount;
use resolution_reconciler::ports::lease::JobLease;

use support::{address, at, Harness, Landing, AUTH, HOUR, NOW};

// ── Scenarios ───────────────────────────────────────────────

#[tokio::test]
async fn test_auto_finalize_undisputed_proposal() {
    let h = Harness::new();
    let market = h.seed_finalizable(1);

    let summary = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();

    assert!(summary.ok);
    assert_eq!(summary.step, "complete");
    assert_eq!(summary.count, 1);
    let result = summary.result_for(&market).unwrap();
    assert!(result.ok && !result.skip);
    let sig = result.tx_sig.clone().unwrap();

    assert_eq!(h.chain.submissions(), vec![("finalize_if_no_disputes", market.clone())]);

    let row = h.index.row(&market).unwrap();
    assert!(row.resolved);
    assert!(!row.cancelled);
    assert_eq!(row.resolution_status, ResolutionStatus::Finalized);
    assert_eq!(row.winning_outcome, Some(1));
    assert_eq!(row.resolve_tx.as_deref(), Some(sig.as_str()));
    assert_eq!(row.resolved_at, Some(support::now()));
}

#[tokio::test]
async fn test_disputed_proposal_is_left_alone() {
    let h = Harness::new();
    let market = h.seed_finalizable(0);
    let mut disputed = h.chain.account(&market).unwrap();
    disputed.dispute_count = 2;
    h.chain.put_market(&market, &disputed);

    let summary = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();

    let result = summary.result_for(&market).unwrap();
    assert!(result.skip);
    assert_eq!(result.reason.as_deref(), Some("has_disputes"));
    assert_eq!(result.diagnostics.dispute_count, Some(2));
    assert!(h.chain.submissions().is_empty());
    assert!(h.index.updates().is_empty());
    assert_eq!(
        h.index.row(&market).unwrap().resolution_status,
        ResolutionStatus::Proposed
    );
}

#[tokio::test]
async fn test_auto_cancel_unproposed_market() {
    let h = Harness::new();
    let market = h.seed_cancellable();

    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();

    let result = summary.result_for(&market).unwrap();
    assert!(result.ok, "{result:?}");
    assert_eq!(h.chain.submissions(), vec![("cancel_if_no_proposal", market.clone())]);

    let row = h.index.row(&market).unwrap();
    assert!(row.cancelled);
    assert_eq!(row.resolution_status, ResolutionStatus::Cancelled);
    assert_eq!(row.cancel_reason.as_deref(), Some("no_proposal_48h"));
    assert_eq!(row.cancel_tx, result.tx_sig);
    assert_eq!(row.cancelled_at, Some(support::now()));
}

#[tokio::test]
async fn test_missing_account_is_skipped_and_run_continues() {
    let h = Harness::new();
    let ghost = address();
    h.index
        .insert(IndexMarket::open(ghost.as_str(), at(NOW - 60 * HOUR)));
    let market = h.seed_cancellable();

    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();

    assert_eq!(summary.count, 2);
    let skipped = summary.result_for(&ghost).unwrap();
    assert!(skipped.skip);
    assert_eq!(skipped.reason.as_deref(), Some("missing_account"));
    assert!(summary.result_for(&market).unwrap().ok);
}

#[tokio::test]
async fn test_onchain_revert_fails_candidate_and_keeps_index() {
    let h = Harness::new();
    let market = h.seed_finalizable(1);
    h.chain
        .land(&market, Landing::Revert("custom program error: 0x1771".into()));

    let summary = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();

    let result = summary.result_for(&market).unwrap();
    assert!(!result.ok && !result.skip);
    assert_eq!(result.reason.as_deref(), Some("onchain_revert"));
    assert!(result.tx_sig.is_some());
    assert!(result.error.as_deref().unwrap().contains("0x1771"));
    assert!(h.index.updates().is_empty());
}

#[tokio::test]
async fn test_submit_rejection_is_reported() {
    let h = Harness::new();
    let market = h.seed_cancellable();
    h.chain.land(
        &market,
        Landing::Reject("Transaction simulation failed: Blockhash not found".into()),
    );

    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();

    let result = summary.result_for(&market).unwrap();
    assert_eq!(result.reason.as_deref(), Some("submit_error"));
    assert!(result.tx_sig.is_none());
    assert!(h.index.updates().is_empty());
}

// ── Properties ──────────────────────────────────────────────

#[tokio::test]
async fn test_stale_index_row_is_not_trusted() {
    let h = Harness::new();
    // index says proposed and past deadline; chain still has the window open
    let market = address();
    h.index.insert(
        IndexMarket::open(market.as_str(), at(NOW - 10 * HOUR)).proposed(0, at(NOW - HOUR)),
    );
    h.chain.put_market(
        &market,
        &ChainMarketAccount::open(NOW - 10 * HOUR).proposed(0, NOW + HOUR),
    );

    let summary = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();

    let result = summary.result_for(&market).unwrap();
    assert_eq!(result.reason.as_deref(), Some("contest_window_open"));
    assert_eq!(result.diagnostics.window_closed, Some(false));
    assert!(h.chain.submissions().is_empty());
}

#[tokio::test]
async fn test_cancel_waits_for_onchain_resolution_time() {
    let h = Harness::new();
    let market = address();
    h.index
        .insert(IndexMarket::open(market.as_str(), at(NOW - 50 * HOUR)));
    h.chain
        .put_market(&market, &ChainMarketAccount::open(NOW + 5 * HOUR));

    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();

    assert_eq!(
        summary.result_for(&market).unwrap().reason.as_deref(),
        Some("not_ended_onchain")
    );
    assert!(h.chain.submissions().is_empty());
}

#[tokio::test]
async fn test_rerun_after_success_does_not_resubmit() {
    let h = Harness::new();
    let market = h.seed_finalizable(1);

    let first = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();
    assert!(first.result_for(&market).unwrap().ok);

    // index row now finalized: not even a candidate
    let second = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();
    assert_eq!(second.count, 0);

    assert_eq!(h.chain.submissions().len(), 1);
}

#[tokio::test]
async fn test_write_matching_no_row_is_reported_with_signature() {
    let h = Harness::new();
    let market = h.seed_cancellable();
    h.index.delete_before_write(&market);

    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();

    let result = summary.result_for(&market).unwrap();
    assert!(!result.ok);
    assert_eq!(result.reason.as_deref(), Some("reconciliation_write_error"));
    assert!(result.tx_sig.is_some());
    assert!(result.error.as_deref().unwrap().contains("matched no row"));
}

#[tokio::test]
async fn test_rerun_with_lagging_index_skips_on_chain_state() {
    let h = Harness::new();
    let market = h.seed_finalizable(1);
    h.index.fail_update(&market);

    let first = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();
    let failed = first.result_for(&market).unwrap();
    assert_eq!(failed.reason.as_deref(), Some("reconciliation_write_error"));
    assert!(failed.tx_sig.is_some(), "signature kept for manual repair");

    // the index still says proposed, but the chain moved on
    let second = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();
    assert_eq!(
        second.result_for(&market).unwrap().reason.as_deref(),
        Some("not_proposed")
    );
    assert_eq!(h.chain.submissions().len(), 1);
}

#[tokio::test]
async fn test_foreign_program_account_is_never_touched() {
    let h = Harness::new();
    let market = address();
    let impostor = address();
    h.index.insert(
        IndexMarket::open(market.as_str(), at(NOW - 10 * HOUR)).proposed(0, at(NOW - HOUR)),
    );
    h.chain.put_owned(
        &market,
        &ChainMarketAccount::open(NOW - 10 * HOUR).proposed(0, NOW - HOUR),
        &impostor,
    );

    let summary = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();

    let result = summary.result_for(&market).unwrap();
    assert_eq!(result.reason.as_deref(), Some("wrong_program_owner"));
    assert_eq!(result.diagnostics.owner.as_deref(), Some(impostor.as_str()));
    assert!(h.chain.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_timeout_is_exact_and_does_not_block_batch() {
    let h = Harness::new();
    let stuck = h.seed_cancellable();
    let next = h.seed_cancellable();
    h.chain.land(&stuck, Landing::Hang);

    let started = tokio::time::Instant::now();
    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();

    // only the stuck candidate waited; the second confirmed on first poll
    assert_eq!(started.elapsed(), Duration::from_secs(90));

    let timed_out = summary.result_for(&stuck).unwrap();
    assert_eq!(timed_out.reason.as_deref(), Some("confirmation_timeout"));
    assert!(timed_out.error.as_deref().unwrap().contains("90000ms"));
    assert!(summary.result_for(&next).unwrap().ok);

    // never resubmitted
    assert_eq!(
        h.chain
            .submissions()
            .iter()
            .filter(|(_, m)| *m == stuck)
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_dropped_trigger_still_finishes_batch_and_releases_lease() {
    let h = Harness::new();
    let stuck = h.seed_cancellable();
    let next = h.seed_cancellable();
    h.chain.land(&stuck, Landing::Hang);

    // caller gives up while the first candidate is still polling
    let abandoned =
        tokio::time::timeout(Duration::from_secs(10), h.runner.run(JobKind::Cancel, Some(AUTH))).await;
    assert!(abandoned.is_err());

    // let the detached run reach its confirmation timeout and carry on
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(
        h.index.row(&next).unwrap().resolution_status,
        ResolutionStatus::Cancelled
    );
    let rendered = h.metrics.render().unwrap();
    assert!(rendered.contains("reason=\"confirmation_timeout\""));

    let token = h
        .lease
        .try_acquire("cancel-no-proposal", Duration::from_secs(60))
        .await
        .unwrap();
    assert!(token.is_some(), "lease still held after the run finished");
}

#[tokio::test]
async fn test_panicking_candidate_is_isolated() {
    let h = Harness::new();
    let first = h.seed_cancellable();
    let bomb = h.seed_cancellable();
    let last = h.seed_cancellable();
    h.chain.panic_on(&bomb);

    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();

    assert_eq!(summary.count, 3);
    assert!(summary.result_for(&first).unwrap().ok);
    let exploded = summary.result_for(&bomb).unwrap();
    assert_eq!(exploded.reason.as_deref(), Some("panicked"));
    assert!(exploded.error.as_deref().unwrap().contains("exploded"));
    assert!(summary.result_for(&last).unwrap().ok);
}

#[tokio::test]
async fn test_chain_query_error_fails_only_that_candidate() {
    let h = Harness::new();
    let flaky = h.seed_cancellable();
    let fine = h.seed_cancellable();
    h.chain.fail_fetch(&flaky);

    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();

    assert_eq!(
        summary.result_for(&flaky).unwrap().reason.as_deref(),
        Some("chain_query_error")
    );
    assert!(summary.result_for(&fine).unwrap().ok);
}

// ── Guard edge cases ────────────────────────────────────────

#[tokio::test]
async fn test_malformed_rows_and_accounts_are_skipped() {
    let h = Harness::new();

    let bad_address = "not-a-pubkey";
    h.index
        .insert(IndexMarket::open(bad_address, at(NOW - 60 * HOUR)));

    let garbage = address();
    h.index
        .insert(IndexMarket::open(garbage.as_str(), at(NOW - 60 * HOUR)));
    h.chain.put_raw(
        &garbage,
        RawAccount {
            owner: h.chain.program_id.clone(),
            data: vec![0u8; 12],
        },
    );

    // empty addresses never become candidates
    h.index.insert(IndexMarket::open("", at(NOW - 60 * HOUR)));

    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();

    assert_eq!(summary.count, 2);
    assert_eq!(
        summary.result_for(bad_address).unwrap().reason.as_deref(),
        Some("invalid_address")
    );
    assert_eq!(
        summary.result_for(&garbage).unwrap().reason.as_deref(),
        Some("undecodable_account")
    );
}

#[tokio::test]
async fn test_cancel_skips_market_that_was_proposed_onchain() {
    let h = Harness::new();
    let market = address();
    h.index
        .insert(IndexMarket::open(market.as_str(), at(NOW - 50 * HOUR)));
    h.chain.put_market(
        &market,
        &ChainMarketAccount::open(NOW - 50 * HOUR).proposed(1, NOW + 3 * HOUR),
    );

    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();
    assert_eq!(
        summary.result_for(&market).unwrap().reason.as_deref(),
        Some("not_open")
    );
}

#[tokio::test]
async fn test_batch_limit_caps_candidates() {
    let h = Harness::with_settings(|s| s.batch_limit = 2);
    for _ in 0..5 {
        h.seed_cancellable();
    }

    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();
    assert_eq!(summary.count, 2);
    assert_eq!(h.chain.submissions().len(), 2);
}

// ── Run-level behaviour ─────────────────────────────────────

#[tokio::test]
async fn test_wrong_secret_is_rejected_before_any_work() {
    let h = Harness::new();
    h.seed_cancellable();

    for header in [None, Some("Bearer nope"), Some("s3cret")] {
        let err = h.runner.run(JobKind::Cancel, header).await.unwrap_err();
        assert!(matches!(err, JobError::Auth));
        assert_eq!(err.step(), "auth");
    }

    assert_eq!(h.connector.connects.load(Ordering::SeqCst), 0);
    assert!(h.chain.submissions().is_empty());
}

#[tokio::test]
async fn test_held_lease_rejects_overlapping_run() {
    let h = Harness::new();
    h.seed_cancellable();
    let token = h
        .lease
        .try_acquire("cancel-no-proposal", Duration::from_secs(60))
        .await
        .unwrap()
        .unwrap();

    let err = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap_err();
    assert!(matches!(err, JobError::LeaseHeld { .. }));
    assert_eq!(err.step(), "lease");
    assert!(h.chain.submissions().is_empty());

    // the other job is unaffected
    assert!(h.runner.run(JobKind::Finalize, Some(AUTH)).await.is_ok());

    h.lease.release(&token).await.unwrap();
    assert!(h.runner.run(JobKind::Cancel, Some(AUTH)).await.is_ok());
}

#[tokio::test]
async fn test_lease_is_released_after_failed_run() {
    let h = Harness::new();
    h.index.fail_query.store(true, Ordering::SeqCst);

    let err = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap_err();
    assert_eq!(err.step(), "scan");

    h.index.fail_query.store(false, Ordering::SeqCst);
    assert!(h.runner.run(JobKind::Finalize, Some(AUTH)).await.is_ok());
}

#[tokio::test]
async fn test_connector_failure_aborts_with_chain_init() {
    let h = Harness::new();
    h.seed_finalizable(0);
    h.connector.fail.store(true, Ordering::SeqCst);

    let err = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap_err();
    assert_eq!(err.step(), "chain_init");
    assert!(err.to_string().contains("base58"));
}

#[tokio::test]
async fn test_each_run_opens_a_fresh_chain_client() {
    let h = Harness::new();
    h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();
    h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();
    assert_eq!(h.connector.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dry_run_reports_eligible_without_submitting() {
    let h = Harness::with_settings(|s| s.dry_run = true);
    let eligible = h.seed_cancellable();
    let early = address();
    h.index
        .insert(IndexMarket::open(early.as_str(), at(NOW - 50 * HOUR)));
    h.chain
        .put_market(&early, &ChainMarketAccount::open(NOW + HOUR));

    let summary = h.runner.run(JobKind::Cancel, Some(AUTH)).await.unwrap();

    let result = summary.result_for(&eligible).unwrap();
    assert!(result.ok && result.skip);
    assert_eq!(result.reason.as_deref(), Some("dry_run"));
    assert_eq!(
        summary.result_for(&early).unwrap().reason.as_deref(),
        Some("not_ended_onchain")
    );
    assert!(h.chain.submissions().is_empty());
    assert!(h.index.updates().is_empty());
}

#[tokio::test]
async fn test_clock_drives_eligibility() {
    let h = Harness::new();
    let market = address();
    h.index.insert(
        IndexMarket::open(market.as_str(), at(NOW - 10 * HOUR)).proposed(1, at(NOW + HOUR)),
    );
    h.chain.put_market(
        &market,
        &ChainMarketAccount::open(NOW - 10 * HOUR).proposed(1, NOW + HOUR),
    );

    let early = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();
    assert_eq!(early.count, 0);

    h.clock.set(at(NOW + HOUR));
    let on_time = h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();
    assert!(on_time.result_for(&market).unwrap().ok);
}

#[tokio::test]
async fn test_metrics_follow_run_outcomes() {
    let h = Harness::new();
    h.seed_finalizable(1);
    let disputed = h.seed_finalizable(0);
    let mut acct = h.chain.account(&disputed).unwrap();
    acct.dispute_count = 1;
    h.chain.put_market(&disputed, &acct);

    h.runner.run(JobKind::Finalize, Some(AUTH)).await.unwrap();
    let _ = h.runner.run(JobKind::Finalize, Some("Bearer wrong")).await;

    let job = "finalize-no-disputes";
    let m = &h.metrics;
    assert_eq!(m.runs.with_label_values(&[job, "complete"]).get(), 1);
    assert_eq!(m.runs.with_label_values(&[job, "auth"]).get(), 1);
    assert_eq!(m.candidates.with_label_values(&[job, "succeeded"]).get(), 1);
    assert_eq!(m.skips.with_label_values(&[job, "has_disputes"]).get(), 1);
    assert_eq!(m.last_run_unix.with_label_values(&[job]).get(), NOW);
}
