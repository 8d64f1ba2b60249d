//! Per-connection state shared by reads and transaction flows.
//!
//! One session covers one account on one chain. Everything that used to be
//! ambient (connected account, protocol constants, last position, the
//! in-flight slot) lives here and is passed around explicitly.

use alloy::primitives::Address;
use dsc_chain::{ChainClient, ChainError, PositionSnapshot, ProtocolConstants};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, instrument};

use crate::clock::SystemClock;
use crate::config::ClientConfig;
use crate::errors::CoreError;
use crate::metrics::{self, UserStats};
use crate::presenter::Presenter;
use crate::stats::{ProtocolStats, ProtocolStatsAggregator};
use crate::store::{FileStatsStore, MemoryStatsStore, StatsStore};

/// State for one connected account on one chain.
#[derive(Debug)]
pub struct Session {
    client: Arc<dyn ChainClient>,
    presenter: Arc<dyn Presenter>,
    account: Option<Address>,
    config: ClientConfig,
    stats: ProtocolStatsAggregator,
    /// Read once per session
    constants: OnceCell<ProtocolConstants>,
    /// Replaced wholesale on every position read
    last_position: RwLock<Option<PositionSnapshot>>,
    in_flight: AtomicBool,
}

/// Holds the session's in-flight slot until dropped.
#[derive(Debug)]
pub struct FlowGuard<'a> {
    slot: &'a AtomicBool,
}

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}

impl Session {
    /// Create a session. The stats cache is file-backed when the config
    /// names a cache directory.
    pub fn new(
        client: Arc<dyn ChainClient>,
        presenter: Arc<dyn Presenter>,
        config: ClientConfig,
    ) -> Self {
        let store: Arc<dyn StatsStore> = match &config.stats.cache_dir {
            Some(dir) => Arc::new(FileStatsStore::new(dir)),
            None => Arc::new(MemoryStatsStore::new()),
        };
        let stats = ProtocolStatsAggregator::new(store, Arc::new(SystemClock))
            .with_ttl(config.stats.cache_ttl())
            .with_window_blocks(config.stats.liquidation_window_blocks);

        Self {
            client,
            presenter,
            account: None,
            config,
            stats,
            constants: OnceCell::new(),
            last_position: RwLock::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Attach the connected account.
    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn client(&self) -> &dyn ChainClient {
        self.client.as_ref()
    }

    pub fn presenter(&self) -> &dyn Presenter {
        self.presenter.as_ref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Position from the most recent successful read.
    pub fn last_position(&self) -> Option<PositionSnapshot> {
        *self.last_position.read()
    }

    /// Protocol constants, read on first use.
    pub async fn protocol_constants(&self) -> Result<ProtocolConstants, ChainError> {
        self.constants
            .get_or_try_init(|| self.client.read_protocol_constants())
            .await
            .copied()
    }

    /// Read the account's position and publish its metrics.
    #[instrument(skip(self), fields(account = ?self.account))]
    pub async fn refresh_position(&self) -> Result<UserStats, CoreError> {
        let account = self.account.ok_or(CoreError::NoAccount)?;

        let (position, price, constants) = tokio::try_join!(
            self.client.read_position(account),
            self.client.read_price_feed(),
            self.protocol_constants(),
        )?;

        *self.last_position.write() = Some(position);

        let stats = metrics::user_stats(&position, &price, &constants).map_err(|e| {
            error!(error = %e, position = ?position, price = ?price, "Position metrics failed");
            e
        })?;

        debug!(health_factor = %stats.health_factor, "Position refreshed");
        self.presenter.user_stats(&stats);
        Ok(stats)
    }

    /// Refresh protocol stats (cached) and publish them.
    pub async fn refresh_protocol_stats(&self) -> ProtocolStats {
        let stats = self.stats.refresh(self.client.as_ref()).await;
        self.presenter.protocol_stats(&stats);
        stats
    }

    /// Claim the in-flight slot. Fails while another flow holds it.
    pub fn begin_flow(&self) -> Result<FlowGuard<'_>, CoreError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CoreError::FlowInFlight)?;
        Ok(FlowGuard {
            slot: &self.in_flight,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use crate::test_support::{session_with, wad, MockChainClient, RecordingPresenter};

    #[tokio::test]
    async fn test_refresh_position_publishes_stats() {
        let client = Arc::new(MockChainClient::new());
        let presenter = Arc::new(RecordingPresenter::new());
        let session = session_with(client.clone(), presenter.clone());

        let stats = session.refresh_position().await.unwrap();
        assert_eq!(stats.collateral_usd, "20000.00");
        assert_eq!(stats.borrowing_power, "5000.00");
        assert_eq!(presenter.user_stats(), vec![stats]);
        assert_eq!(session.last_position().unwrap().dsc_minted, wad(5000));
    }

    #[tokio::test]
    async fn test_constants_read_once() {
        let client = Arc::new(MockChainClient::new());
        let session = session_with(client.clone(), Arc::new(RecordingPresenter::new()));

        session.refresh_position().await.unwrap();
        session.refresh_position().await.unwrap();
        assert_eq!(client.constants_reads(), 1);
    }

    #[tokio::test]
    async fn test_position_replaced_wholesale() {
        let client = Arc::new(MockChainClient::new());
        let session = session_with(client.clone(), Arc::new(RecordingPresenter::new()));

        session.refresh_position().await.unwrap();
        client.set_position(PositionSnapshot {
            collateral_deposited: wad(1),
            dsc_minted: U256::ZERO,
            health_factor_raw: U256::MAX,
        });
        session.refresh_position().await.unwrap();

        let position = session.last_position().unwrap();
        assert_eq!(position.collateral_deposited, wad(1));
        assert_eq!(position.dsc_minted, U256::ZERO);
    }

    #[tokio::test]
    async fn test_math_failure_surfaces() {
        let client = Arc::new(MockChainClient::new());
        client.set_price_decimals(24);
        let presenter = Arc::new(RecordingPresenter::new());
        let session = session_with(client, presenter.clone());

        let err = session.refresh_position().await.unwrap_err();
        assert!(matches!(err, CoreError::Math(_)));
        assert!(presenter.user_stats().is_empty());
    }

    #[tokio::test]
    async fn test_requires_account() {
        let session = Session::new(
            Arc::new(MockChainClient::new()),
            Arc::new(RecordingPresenter::new()),
            ClientConfig::default(),
        );
        assert!(matches!(
            session.refresh_position().await,
            Err(CoreError::NoAccount)
        ));
    }

    #[test]
    fn test_single_flow_slot() {
        let session = Session::new(
            Arc::new(MockChainClient::new()),
            Arc::new(RecordingPresenter::new()),
            ClientConfig::default(),
        );

        let guard = session.begin_flow().unwrap();
        assert!(session.is_busy());
        assert!(matches!(session.begin_flow(), Err(CoreError::FlowInFlight)));

        drop(guard);
        assert!(!session.is_busy());
        assert!(session.begin_flow().is_ok());
    }
}
