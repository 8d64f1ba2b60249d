//! Protocol-wide statistics with a single-slot cache.
//!
//! A refresh serves the cached values while they are younger than the TTL.
//! Otherwise all chain reads are issued together and joined; any failure
//! fails the whole refresh, which then falls back to the last cached values
//! (of any age) or to the unavailable sentinel.

use alloy::primitives::U256;
use dsc_chain::{AggregateMetric, ChainClient};
use futures::TryFutureExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::errors::{CoreError, ErrorKind};
use crate::store::{CachedStats, StatsStore};
use crate::u256_math::{self, MathError, WAD_DECIMALS};

/// Default cache freshness window.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(120);

/// Blocks scanned for liquidations (~1 day at 12s blocks).
pub const DEFAULT_LIQUIDATION_WINDOW_BLOCKS: u64 = 7200;

/// Shown for every metric when nothing could be fetched or cached.
pub const UNAVAILABLE: &str = "-";

/// Fractional digits of every fetched metric.
const STATS_PRECISION: u8 = 2;

/// Displayed protocol metrics, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolMetric {
    TvlUsd,
    TvlCollateral,
    StableSupply,
    OvercollateralizationRatio,
    LiquidationRatio,
    LiquidationVolumeUsd,
}

impl ProtocolMetric {
    /// All metrics in the order their values are stored.
    pub const ALL: [ProtocolMetric; 6] = [
        Self::TvlUsd,
        Self::TvlCollateral,
        Self::StableSupply,
        Self::OvercollateralizationRatio,
        Self::LiquidationRatio,
        Self::LiquidationVolumeUsd,
    ];

    /// Constant value, for metrics that need no chain read.
    pub fn constant_value(&self) -> Option<&'static str> {
        match self {
            Self::OvercollateralizationRatio => Some("200%"),
            Self::LiquidationRatio => Some("100%"),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TvlUsd => "tvl-usd",
            Self::TvlCollateral => "tvl-eth",
            Self::StableSupply => "minted",
            Self::OvercollateralizationRatio => "oc-ratio",
            Self::LiquidationRatio => "liq-ratio",
            Self::LiquidationVolumeUsd => "liq-vol",
        }
    }
}

/// Where a set of returned values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsSource {
    /// Served from a fresh cache slot, no reads issued
    Cache,
    /// Just fetched
    Fresh,
    /// Fetch failed; previous values returned regardless of age
    StaleFallback,
    /// Fetch failed and nothing was cached
    Unavailable,
}

/// Result of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolStats {
    /// One value per [`ProtocolMetric::ALL`] entry
    pub values: Vec<String>,
    pub source: StatsSource,
    /// Fetch time of the values (Unix millis), when known
    pub timestamp: Option<u64>,
}

impl ProtocolStats {
    /// Value of one metric.
    pub fn get(&self, metric: ProtocolMetric) -> Option<&str> {
        let index = ProtocolMetric::ALL.iter().position(|m| *m == metric)?;
        self.values.get(index).map(String::as_str)
    }

    /// Whether this refresh failed (stale or unavailable).
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, StatsSource::StaleFallback | StatsSource::Unavailable)
    }

    /// Failure kind of a degraded refresh.
    pub fn failure(&self) -> Option<ErrorKind> {
        self.is_degraded().then_some(ErrorKind::AggregationFailed)
    }

    fn from_cache(cached: CachedStats, source: StatsSource) -> Self {
        Self {
            values: cached.values,
            source,
            timestamp: Some(cached.timestamp),
        }
    }

    fn unavailable() -> Self {
        Self {
            values: vec![UNAVAILABLE.to_string(); ProtocolMetric::ALL.len()],
            source: StatsSource::Unavailable,
            timestamp: None,
        }
    }
}

/// Fan-out/fan-in collector of protocol metrics.
#[derive(Debug)]
pub struct ProtocolStatsAggregator {
    store: Arc<dyn StatsStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    window_blocks: u64,
}

impl ProtocolStatsAggregator {
    /// Create an aggregator with the default TTL and liquidation window.
    pub fn new(store: Arc<dyn StatsStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl: DEFAULT_CACHE_TTL,
            window_blocks: DEFAULT_LIQUIDATION_WINDOW_BLOCKS,
        }
    }

    /// Set the cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the liquidation scan window.
    pub fn with_window_blocks(mut self, blocks: u64) -> Self {
        self.window_blocks = blocks;
        self
    }

    /// Current cache record, without refreshing.
    pub fn cached(&self) -> Option<CachedStats> {
        self.store.load()
    }

    /// Return fresh-enough stats, fetching when the cache is stale.
    #[instrument(skip_all)]
    pub async fn refresh<C>(&self, client: &C) -> ProtocolStats
    where
        C: ChainClient + ?Sized,
    {
        let now = self.clock.now_millis();
        let cached = self.store.load();

        if let Some(cached) = cached.as_ref() {
            if cached.is_fresh(now, self.ttl.as_millis() as u64) {
                debug!(age_ms = cached.age_millis(now), "Serving protocol stats from cache");
                return ProtocolStats::from_cache(cached.clone(), StatsSource::Cache);
            }
        }

        match self.fetch(client).await {
            Ok(values) => {
                let record = CachedStats {
                    values,
                    timestamp: now,
                };
                self.store.save(&record);
                info!(values = ?record.values, "Protocol stats refreshed");
                ProtocolStats::from_cache(record, StatsSource::Fresh)
            }
            Err(e) => {
                warn!(
                    kind = ?ErrorKind::AggregationFailed,
                    error = %e,
                    has_cache = cached.is_some(),
                    "Protocol stats refresh failed"
                );
                match cached {
                    Some(cached) => ProtocolStats::from_cache(cached, StatsSource::StaleFallback),
                    None => ProtocolStats::unavailable(),
                }
            }
        }
    }

    /// Issue every read concurrently and format the six metric values.
    async fn fetch<C>(&self, client: &C) -> Result<Vec<String>, CoreError>
    where
        C: ChainClient + ?Sized,
    {
        let (price, tvl, supply, liquidated) = tokio::try_join!(
            client.read_price_feed().map_err(CoreError::from),
            client
                .read_aggregate_metric(AggregateMetric::TotalDepositedCollateral)
                .map_err(CoreError::from),
            client
                .read_aggregate_metric(AggregateMetric::StableSupply)
                .map_err(CoreError::from),
            self.liquidated_collateral(client),
        )?;

        let tvl_usd = u256_math::to_usd_value(tvl, price.answer, price.decimals)?;
        let volume_usd = u256_math::to_usd_value(liquidated, price.answer, price.decimals)?;

        let values = ProtocolMetric::ALL
            .iter()
            .map(|metric| match metric {
                ProtocolMetric::TvlUsd => format_metric(tvl_usd),
                ProtocolMetric::TvlCollateral => format_metric(tvl),
                ProtocolMetric::StableSupply => format_metric(supply),
                ProtocolMetric::LiquidationVolumeUsd => format_metric(volume_usd),
                constant => constant
                    .constant_value()
                    .unwrap_or(UNAVAILABLE)
                    .to_string(),
            })
            .collect();

        Ok(values)
    }

    /// Collateral sold in liquidations over the trailing window.
    async fn liquidated_collateral<C>(&self, client: &C) -> Result<U256, CoreError>
    where
        C: ChainClient + ?Sized,
    {
        let latest = client.latest_block().await?;
        let from = latest.saturating_sub(self.window_blocks);
        let events = client.query_liquidation_events(from, latest).await?;

        let total = events
            .iter()
            .try_fold(U256::ZERO, |acc, event| acc.checked_add(event.collateral_sold))
            .ok_or(MathError::Overflow {
                op: "liquidation volume",
            })?;

        debug!(
            from = from,
            to = latest,
            events = events.len(),
            total = %total,
            "Liquidation volume scanned"
        );
        Ok(total)
    }
}

fn format_metric(value: U256) -> String {
    u256_math::to_display_string(value, WAD_DECIMALS, STATS_PRECISION)
}
