//! Chain client abstraction consumed by the core.

use crate::calls::ContractCall;
use crate::error::ChainError;
use crate::types::{
    AggregateMetric, LiquidationEvent, PositionSnapshot, PriceFeedSnapshot, ProtocolConstants,
};
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::fmt::Debug;

/// Reads and writes against the deployed protocol.
///
/// Every method is a suspension point; implementations must not block the
/// runtime. Failures are reported as [`ChainError`] so the caller can
/// classify them.
#[async_trait]
pub trait ChainClient: Send + Sync + Debug {
    /// Read the position of `account`.
    async fn read_position(&self, account: Address) -> Result<PositionSnapshot, ChainError>;

    /// Read the protocol's fixed parameters.
    async fn read_protocol_constants(&self) -> Result<ProtocolConstants, ChainError>;

    /// Read the collateral price feed.
    async fn read_price_feed(&self) -> Result<PriceFeedSnapshot, ChainError>;

    /// Read a protocol-wide total.
    async fn read_aggregate_metric(&self, metric: AggregateMetric) -> Result<U256, ChainError>;

    /// Latest block number.
    async fn latest_block(&self) -> Result<u64, ChainError>;

    /// `Liquidated` events in `[from_block, to_block]`, in log order.
    async fn query_liquidation_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LiquidationEvent>, ChainError>;

    /// Sign and broadcast `call`, returning its hash once accepted.
    async fn submit(&self, call: &ContractCall) -> Result<B256, ChainError>;

    /// Wait until `hash` has `confirmations` blocks on top of (and including)
    /// its inclusion block. A reverted receipt is a failure.
    async fn await_confirmations(&self, hash: B256, confirmations: u64) -> Result<(), ChainError>;
}
