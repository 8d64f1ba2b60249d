//! In-crate doubles for the chain client, presenter and clock.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use dsc_chain::{
    AggregateMetric, ChainClient, ChainError, ContractCall, LiquidationEvent, PositionSnapshot,
    PriceFeedSnapshot, ProtocolConstants,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::ClientConfig;
use crate::errors::ErrorMessage;
use crate::metrics::UserStats;
use crate::presenter::Presenter;
use crate::session::Session;
use crate::stats::ProtocolStats;
use crate::transaction::TransactionState;
use crate::u256_math::{pow10, WAD};

pub fn wad(n: u64) -> U256 {
    U256::from(n) * WAD
}

pub const TEST_ACCOUNT: Address = Address::new([0xaa; 20]);

/// Session over the given doubles, with [`TEST_ACCOUNT`] connected.
pub fn session_with(client: Arc<MockChainClient>, presenter: Arc<RecordingPresenter>) -> Session {
    Session::new(client, presenter, ClientConfig::default()).with_account(TEST_ACCOUNT)
}

/// Scriptable chain client.
///
/// Defaults: 10 ETH deposited, 5000 DSC minted, health factor 2.0,
/// ETH at $2000 (8 decimals), 100 ETH total collateral, 50000 DSC supply.
#[derive(Debug)]
pub struct MockChainClient {
    position: Mutex<PositionSnapshot>,
    price: Mutex<PriceFeedSnapshot>,
    constants: ProtocolConstants,
    total_collateral: U256,
    supply: U256,
    latest_block: AtomicU64,
    liquidations: Mutex<Vec<LiquidationEvent>>,
    fail_reads: AtomicBool,
    failing_reads: Mutex<HashSet<&'static str>>,
    confirmation_failures: Mutex<HashMap<u8, ChainError>>,
    submit_failures: Mutex<HashMap<&'static str, ChainError>>,
    submitted: Mutex<Vec<ContractCall>>,
    confirmed: Mutex<Vec<(B256, u64)>>,
    last_log_range: Mutex<Option<(u64, u64)>>,
    reads: AtomicUsize,
    constants_reads: AtomicUsize,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            position: Mutex::new(PositionSnapshot {
                collateral_deposited: wad(10),
                dsc_minted: wad(5000),
                health_factor_raw: wad(2),
            }),
            price: Mutex::new(PriceFeedSnapshot {
                decimals: 8,
                answer: U256::from(2000u64) * pow10(8),
                updated_at: 1_700_000_000,
            }),
            constants: ProtocolConstants {
                minimum_health_factor: WAD,
                precision: WAD,
                liquidation_threshold: U256::from(50u64),
                liquidation_precision: U256::from(100u64),
            },
            total_collateral: wad(100),
            supply: wad(50_000),
            latest_block: AtomicU64::new(10_000),
            liquidations: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            failing_reads: Mutex::new(HashSet::new()),
            confirmation_failures: Mutex::new(HashMap::new()),
            submit_failures: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            confirmed: Mutex::new(Vec::new()),
            last_log_range: Mutex::new(None),
            reads: AtomicUsize::new(0),
            constants_reads: AtomicUsize::new(0),
        }
    }

    pub fn set_position(&self, position: PositionSnapshot) {
        *self.position.lock() = position;
    }

    pub fn set_price_decimals(&self, decimals: u8) {
        self.price.lock().decimals = decimals;
    }

    pub fn set_latest_block(&self, block: u64) {
        self.latest_block.store(block, Ordering::SeqCst);
    }

    pub fn push_liquidation(&self, event: LiquidationEvent) {
        self.liquidations.lock().push(event);
    }

    /// Make every read fail until reset.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make only the read named `method` fail.
    pub fn fail_read(&self, method: &'static str) {
        self.failing_reads.lock().insert(method);
    }

    /// Fail the confirmation of the `nth` submitted transaction (1-based).
    pub fn fail_confirmation(&self, nth: u8, err: ChainError) {
        self.confirmation_failures.lock().insert(nth, err);
    }

    /// Fail the next submission of the call named `name`.
    pub fn fail_submit(&self, name: &'static str, err: ChainError) {
        self.submit_failures.lock().insert(name, err);
    }

    pub fn submitted(&self) -> Vec<ContractCall> {
        self.submitted.lock().clone()
    }

    pub fn confirmed(&self) -> Vec<(B256, u64)> {
        self.confirmed.lock().clone()
    }

    pub fn last_log_range(&self) -> Option<(u64, u64)> {
        *self.last_log_range.lock()
    }

    /// Chain reads issued so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn constants_reads(&self) -> usize {
        self.constants_reads.load(Ordering::SeqCst)
    }

    fn read(&self, method: &'static str) -> Result<(), ChainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) || self.failing_reads.lock().contains(method) {
            return Err(ChainError::other("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn read_position(&self, _account: Address) -> Result<PositionSnapshot, ChainError> {
        self.read("read_position")?;
        Ok(*self.position.lock())
    }

    async fn read_protocol_constants(&self) -> Result<ProtocolConstants, ChainError> {
        self.read("read_protocol_constants")?;
        self.constants_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.constants)
    }

    async fn read_price_feed(&self) -> Result<PriceFeedSnapshot, ChainError> {
        self.read("read_price_feed")?;
        Ok(*self.price.lock())
    }

    async fn read_aggregate_metric(&self, metric: AggregateMetric) -> Result<U256, ChainError> {
        self.read("read_aggregate_metric")?;
        Ok(match metric {
            AggregateMetric::TotalDepositedCollateral => self.total_collateral,
            AggregateMetric::StableSupply => self.supply,
        })
    }

    async fn latest_block(&self) -> Result<u64, ChainError> {
        self.read("latest_block")?;
        Ok(self.latest_block.load(Ordering::SeqCst))
    }

    async fn query_liquidation_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LiquidationEvent>, ChainError> {
        self.read("query_liquidation_events")?;
        *self.last_log_range.lock() = Some((from_block, to_block));
        Ok(self
            .liquidations
            .lock()
            .iter()
            .filter(|e| (from_block..=to_block).contains(&e.block_number))
            .copied()
            .collect())
    }

    async fn submit(&self, call: &ContractCall) -> Result<B256, ChainError> {
        if let Some(err) = self.submit_failures.lock().remove(call.name()) {
            return Err(err);
        }
        let mut submitted = self.submitted.lock();
        submitted.push(*call);
        Ok(B256::with_last_byte(submitted.len() as u8))
    }

    async fn await_confirmations(&self, hash: B256, confirmations: u64) -> Result<(), ChainError> {
        // Hashes are numbered by submission order
        if let Some(err) = self.confirmation_failures.lock().remove(&hash[31]) {
            return Err(err);
        }
        self.confirmed.lock().push((hash, confirmations));
        Ok(())
    }
}

/// Everything a presenter was asked to show.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenterEvent {
    UserStats(UserStats),
    ProtocolStats(ProtocolStats),
    State(TransactionState),
    Message(ErrorMessage),
    ExecuteEnabled(bool),
}

#[derive(Debug, Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<PresenterEvent>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PresenterEvent> {
        self.events.lock().clone()
    }

    pub fn states(&self) -> Vec<TransactionState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<ErrorMessage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn user_stats(&self) -> Vec<UserStats> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::UserStats(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn last_execute_enabled(&self) -> Option<bool> {
        self.events().into_iter().rev().find_map(|e| match e {
            PresenterEvent::ExecuteEnabled(enabled) => Some(enabled),
            _ => None,
        })
    }

    fn record(&self, event: PresenterEvent) {
        self.events.lock().push(event);
    }
}

impl Presenter for RecordingPresenter {
    fn user_stats(&self, stats: &UserStats) {
        self.record(PresenterEvent::UserStats(stats.clone()));
    }

    fn protocol_stats(&self, stats: &ProtocolStats) {
        self.record(PresenterEvent::ProtocolStats(stats.clone()));
    }

    fn transaction_state(&self, state: &TransactionState) {
        self.record(PresenterEvent::State(*state));
    }

    fn error_message(&self, message: &ErrorMessage) {
        self.record(PresenterEvent::Message(message.clone()));
    }

    fn execute_enabled(&self, enabled: bool) {
        self.record(PresenterEvent::ExecuteEnabled(enabled));
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(now_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
