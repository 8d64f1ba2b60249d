//! Data read from the protocol and its oracle.

use alloy::primitives::{I256, U256};
use serde::{Deserialize, Serialize};

/// Raw position of one account as reported by `getPositionInfo`.
///
/// All fields are 18-decimal integers. A snapshot is never patched; a newer
/// read replaces it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Collateral deposited (collateral units, 18 decimals)
    pub collateral_deposited: U256,
    /// DSC minted against the collateral (18 decimals)
    pub dsc_minted: U256,
    /// Health factor computed on-chain (18 decimals)
    pub health_factor_raw: U256,
}

/// One oracle read: `decimals()` plus the answer of `latestRoundData()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeedSnapshot {
    /// Price decimals (8 for Chainlink USD feeds)
    pub decimals: u8,
    /// Price answer in `decimals` precision
    pub answer: U256,
    /// Timestamp when the answer was computed
    pub updated_at: u64,
}

impl PriceFeedSnapshot {
    /// Build a snapshot from a signed aggregator answer.
    /// Negative answers carry no usable price and are clamped to zero.
    pub fn from_signed(decimals: u8, answer: I256, updated_at: u64) -> Self {
        let answer = if answer.is_negative() {
            U256::ZERO
        } else {
            answer.into_raw()
        };

        Self {
            decimals,
            answer,
            updated_at,
        }
    }
}

/// Protocol parameters read once per chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConstants {
    pub minimum_health_factor: U256,
    pub precision: U256,
    pub liquidation_threshold: U256,
    pub liquidation_precision: U256,
}

/// Protocol-wide totals readable from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateMetric {
    /// Total collateral held by the engine
    TotalDepositedCollateral,
    /// Total DSC in circulation
    StableSupply,
}

impl AggregateMetric {
    /// Name of the engine getter backing this metric.
    pub fn getter(&self) -> &'static str {
        match self {
            Self::TotalDepositedCollateral => "getTotalDepositedCollateral",
            Self::StableSupply => "getDSCSupply",
        }
    }
}

/// A decoded `Liquidated` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationEvent {
    /// Block the event was emitted in
    pub block_number: u64,
    /// Collateral sold to the liquidator (18 decimals)
    pub collateral_sold: U256,
}
