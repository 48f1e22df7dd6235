//! Hand-written fakes shared by the integration tests.
//!
//! `FakeChain` stores real Anchor-encoded market accounts and applies
//! the on-chain transition when a transaction "lands", so re-running a
//! job observes the moved chain state exactly like a live cluster.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;

use resolution_reconciler::adapters::chain::layout::{decode_market_account, encode_market_account};
use resolution_reconciler::adapters::lease::InMemoryLease;
use resolution_reconciler::adapters::metrics::ReconcilerMetrics;
use resolution_reconciler::config::Secret;
use resolution_reconciler::domain::error::DecodeError;
use resolution_reconciler::domain::job::JobKind;
use resolution_reconciler::domain::market::{ChainMarketAccount, ChainMarketStatus, IndexMarket};
use resolution_reconciler::ports::chain_client::{
    AccountRef, ChainClient, ChainConnector, RawAccount, SignatureStatus, SubmitOptions, UnsignedTx,
};
use resolution_reconciler::ports::clock::Clock;
use resolution_reconciler::ports::index::{Filter, IndexRepository, MarketPatch};
use resolution_reconciler::usecases::orchestrator::ConfirmPolicy;
use resolution_reconciler::usecases::{JobRunner, JobSettings, RunnerPorts};

pub const SECRET: &str = "s3cret";
pub const AUTH: &str = "Bearer s3cret";
/// 2026-09-21T14:13:20Z
pub const NOW: i64 = 1_790_000_000;
pub const HOUR: i64 = 3600;

pub fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(NOW, 0).unwrap()
}

pub fn at(unix: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix, 0).unwrap()
}

pub fn address() -> String {
    Pubkey::new_unique().to_string()
}

// ── Chain ───────────────────────────────────────────────────

/// How a submitted transaction behaves.
#[derive(Debug, Clone)]
pub enum Landing {
    /// Lands and confirms; the account transitions.
    Confirm,
    /// Lands with a program error.
    Revert(String),
    /// Rejected at submission (preflight).
    Reject(String),
    /// Never reaches a terminal status.
    Hang,
}

pub struct FakeChain {
    pub program_id: String,
    signer: String,
    accounts: Mutex<HashMap<String, RawAccount>>,
    landing: Mutex<HashMap<String, Landing>>,
    panics: Mutex<HashSet<String>>,
    fetch_errors: Mutex<HashSet<String>>,
    statuses: Mutex<HashMap<String, SignatureStatus>>,
    submissions: Mutex<Vec<(&'static str, String)>>,
    status_queries: AtomicUsize,
    next_sig: AtomicU64,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            program_id: address(),
            signer: address(),
            accounts: Mutex::new(HashMap::new()),
            landing: Mutex::new(HashMap::new()),
            panics: Mutex::new(HashSet::new()),
            fetch_errors: Mutex::new(HashSet::new()),
            statuses: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            status_queries: AtomicUsize::new(0),
            next_sig: AtomicU64::new(1),
        }
    }

    /// Store `account` owned by the configured program.
    pub fn put_market(&self, address: &str, account: &ChainMarketAccount) {
        let owner = self.program_id.clone();
        self.put_owned(address, account, &owner);
    }

    pub fn put_owned(&self, address: &str, account: &ChainMarketAccount, owner: &str) {
        self.put_raw(
            address,
            RawAccount {
                owner: owner.to_string(),
                data: encode_market_account(account),
            },
        );
    }

    pub fn put_raw(&self, address: &str, raw: RawAccount) {
        self.accounts.lock().unwrap().insert(address.to_string(), raw);
    }

    pub fn land(&self, address: &str, landing: Landing) {
        self.landing.lock().unwrap().insert(address.to_string(), landing);
    }

    pub fn panic_on(&self, address: &str) {
        self.panics.lock().unwrap().insert(address.to_string());
    }

    pub fn fail_fetch(&self, address: &str) {
        self.fetch_errors.lock().unwrap().insert(address.to_string());
    }

    pub fn account(&self, address: &str) -> Option<ChainMarketAccount> {
        let raw = self.accounts.lock().unwrap().get(address).cloned()?;
        decode_market_account(&raw.data).ok()
    }

    /// `(instruction, market)` for every submitted transaction, in order.
    pub fn submissions(&self) -> Vec<(&'static str, String)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    fn apply_transition(&self, instruction: &str, market: &str) {
        let mut accounts = self.accounts.lock().unwrap();
        let Some(raw) = accounts.get_mut(market) else {
            return;
        };
        let Ok(mut account) = decode_market_account(&raw.data) else {
            return;
        };
        if instruction == JobKind::Finalize.instruction() {
            account.status = ChainMarketStatus::Finalized;
            account.resolved = true;
            account.winning_outcome = account.proposed_outcome;
        } else {
            account.status = ChainMarketStatus::Cancelled;
            account.cancelled = true;
        }
        raw.data = encode_market_account(&account);
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn get_account(&self, address: &str) -> anyhow::Result<Option<RawAccount>> {
        let should_panic = self.panics.lock().unwrap().contains(address);
        if should_panic {
            panic!("fake chain exploded on {address}");
        }
        let should_fail = self.fetch_errors.lock().unwrap().contains(address);
        if should_fail {
            anyhow::bail!("429 Too Many Requests");
        }
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    fn decode_market(&self, data: &[u8]) -> Result<ChainMarketAccount, DecodeError> {
        decode_market_account(data)
    }

    async fn build_instruction(&self, kind: JobKind, market: &str) -> anyhow::Result<UnsignedTx> {
        Ok(UnsignedTx {
            program_id: self.program_id.clone(),
            instruction: kind.instruction(),
            accounts: vec![
                AccountRef {
                    address: market.to_string(),
                    is_signer: false,
                    is_writable: true,
                },
                AccountRef {
                    address: self.signer.clone(),
                    is_signer: true,
                    is_writable: true,
                },
            ],
            data: Vec::new(),
            fee_payer: self.signer.clone(),
        })
    }

    async fn sign_and_submit(&self, tx: &UnsignedTx, _options: SubmitOptions) -> anyhow::Result<String> {
        let market = tx.accounts[0].address.clone();
        self.submissions
            .lock()
            .unwrap()
            .push((tx.instruction, market.clone()));

        let landing = self
            .landing
            .lock()
            .unwrap()
            .get(&market)
            .cloned()
            .unwrap_or(Landing::Confirm);
        let signature = format!("sig{}", self.next_sig.fetch_add(1, Ordering::SeqCst));

        match landing {
            Landing::Confirm => {
                self.apply_transition(tx.instruction, &market);
                self.statuses
                    .lock()
                    .unwrap()
                    .insert(signature.clone(), SignatureStatus::Confirmed);
            }
            Landing::Revert(error) => {
                self.statuses
                    .lock()
                    .unwrap()
                    .insert(signature.clone(), SignatureStatus::Failed(error));
            }
            Landing::Reject(error) => anyhow::bail!(error),
            Landing::Hang => {}
        }
        Ok(signature)
    }

    async fn signature_status(&self, signature: &str) -> anyhow::Result<SignatureStatus> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(signature)
            .cloned()
            .unwrap_or(SignatureStatus::Pending))
    }

    fn signer_address(&self) -> String {
        self.signer.clone()
    }
}

pub struct FakeConnector {
    chain: Arc<FakeChain>,
    pub fail: AtomicBool,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(chain: Arc<FakeChain>) -> Self {
        Self {
            chain,
            fail: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChainConnector for FakeConnector {
    async fn connect(&self) -> anyhow::Result<Arc<dyn ChainClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("signer secret is not valid base58");
        }
        Ok(self.chain.clone())
    }
}

// ── Index ───────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeIndex {
    rows: Mutex<Vec<IndexMarket>>,
    pub fail_query: AtomicBool,
    fail_updates: Mutex<HashSet<String>>,
    deleted_before_write: Mutex<HashSet<String>>,
    updates: Mutex<Vec<(String, MarketPatch)>>,
}

impl FakeIndex {
    pub fn insert(&self, row: IndexMarket) {
        self.rows.lock().unwrap().push(row);
    }

    pub fn fail_update(&self, address: &str) {
        self.fail_updates.lock().unwrap().insert(address.to_string());
    }

    /// Remove the row between scan and write-back, as a concurrent delete would.
    pub fn delete_before_write(&self, address: &str) {
        self.deleted_before_write
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    pub fn row(&self, address: &str) -> Option<IndexMarket> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.address == address)
            .cloned()
    }

    pub fn updates(&self) -> Vec<(String, MarketPatch)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl IndexRepository for FakeIndex {
    async fn query(&self, filters: &[Filter], limit: usize) -> anyhow::Result<Vec<IndexMarket>> {
        if self.fail_query.load(Ordering::SeqCst) {
            anyhow::bail!("index error 503 Service Unavailable");
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| filters.iter().all(|f| f.matches(row)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_by_address(&self, address: &str, patch: &MarketPatch) -> anyhow::Result<()> {
        let should_fail = self.fail_updates.lock().unwrap().contains(address);
        if should_fail {
            anyhow::bail!("index update timed out");
        }
        self.updates
            .lock()
            .unwrap()
            .push((address.to_string(), patch.clone()));
        let mut rows = self.rows.lock().unwrap();
        if self.deleted_before_write.lock().unwrap().contains(address) {
            rows.retain(|row| row.address != address);
        }
        let mut matched = 0;
        for row in rows.iter_mut().filter(|row| row.address == address) {
            patch.apply_to(row);
            matched += 1;
        }
        anyhow::ensure!(matched > 0, "index update matched no row for {address}");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

// ── Clock ───────────────────────────────────────────────────

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

// ── Harness ─────────────────────────────────────────────────

pub struct Harness {
    pub chain: Arc<FakeChain>,
    pub connector: Arc<FakeConnector>,
    pub index: Arc<FakeIndex>,
    pub clock: Arc<FixedClock>,
    pub lease: Arc<InMemoryLease>,
    pub metrics: Arc<ReconcilerMetrics>,
    pub runner: JobRunner,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    pub fn with_settings(tweak: impl FnOnce(&mut JobSettings)) -> Self {
        let chain = Arc::new(FakeChain::new());
        let connector = Arc::new(FakeConnector::new(chain.clone()));
        let index = Arc::new(FakeIndex::default());
        let clock = Arc::new(FixedClock::at(now()));
        let lease = Arc::new(InMemoryLease::new());
        let metrics = Arc::new(ReconcilerMetrics::new().unwrap());

        let mut settings = JobSettings {
            program_id: chain.program_id.clone(),
            cron_secret: Secret::new(SECRET),
            batch_limit: 50,
            confirm: ConfirmPolicy::default(),
            dry_run: false,
            lease_ttl: Duration::from_secs(300),
        };
        tweak(&mut settings);

        let ports = RunnerPorts {
            connector: connector.clone(),
            index: index.clone(),
            lease: lease.clone(),
            clock: clock.clone(),
            observer: metrics.clone(),
        };

        Self {
            chain,
            connector,
            index,
            clock,
            lease,
            metrics,
            runner: JobRunner::new(ports, settings),
        }
    }

    /// A proposed market, in both index and chain, whose window closed an hour ago.
    pub fn seed_finalizable(&self, outcome: u8) -> String {
        let market = address();
        let deadline = NOW - HOUR;
        self.index
            .insert(IndexMarket::open(market.as_str(), at(NOW - 10 * HOUR)).proposed(outcome, at(deadline)));
        self.chain.put_market(
            &market,
            &ChainMarketAccount::open(NOW - 10 * HOUR).proposed(outcome, deadline),
        );
        market
    }

    /// An open market whose trading ended 50 hours ago.
    pub fn seed_cancellable(&self) -> String {
        let market = address();
        self.index
            .insert(IndexMarket::open(market.as_str(), at(NOW - 50 * HOUR)));
        self.chain
            .put_market(&market, &ChainMarketAccount::open(NOW - 50 * HOUR));
        market
    }
}
