//! Position risk metrics derived from raw engine and oracle reads.
//!
//! Every function here is pure: the same snapshots always produce the same
//! numbers, and nothing reads the chain or touches presentation.

use alloy::primitives::U256;
use dsc_chain::{PositionSnapshot, PriceFeedSnapshot, ProtocolConstants};
use serde::{Deserialize, Serialize};

use crate::u256_math::{self, MathError, WAD_DECIMALS};

/// Loan-to-value ceiling used for borrowing power (50%).
pub const MAX_LTV_PERCENT: u64 = 50;

/// Health factor display cap, in hundredths (10000.00).
const HEALTH_FACTOR_CAP_HUNDREDTHS: u64 = 1_000_000;

/// Display text once the health factor exceeds the cap.
pub const HEALTH_FACTOR_CAPPED: &str = "10,000+";

/// Fractional digits per `UserStats` field.
pub mod precision {
    pub const HEALTH_FACTOR: u8 = 2;
    pub const COLLATERAL: u8 = 6;
    pub const COLLATERAL_USD: u8 = 2;
    pub const DEBT: u8 = 6;
    pub const BORROWING_POWER: u8 = 2;
    pub const LIQUIDATION_PRICE: u8 = 2;
}

/// Display-ready position metrics for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub health_factor: String,
    pub collateral: String,
    pub collateral_usd: String,
    pub debt: String,
    pub borrowing_power: String,
    pub liquidation_price: String,
}

/// Remaining mint capacity of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowingPower {
    /// DSC that can still be minted
    Available(U256),
    /// Debt already exceeds the LTV ceiling by `shortfall`
    Exhausted { shortfall: U256 },
}

impl BorrowingPower {
    /// Amount safe to show: exhausted positions show zero.
    pub fn clamped(&self) -> U256 {
        match self {
            Self::Available(amount) => *amount,
            Self::Exhausted { .. } => U256::ZERO,
        }
    }
}

/// Health factor truncated to two decimals, as hundredths.
#[inline]
pub fn health_factor_hundredths(position: &PositionSnapshot) -> U256 {
    u256_math::truncate_to_precision(
        position.health_factor_raw,
        WAD_DECIMALS,
        precision::HEALTH_FACTOR,
    )
}

/// Health factor display string (two decimals, capped at "10,000+").
pub fn health_factor_display(position: &PositionSnapshot) -> String {
    if health_factor_hundredths(position) > U256::from(HEALTH_FACTOR_CAP_HUNDREDTHS) {
        return HEALTH_FACTOR_CAPPED.to_string();
    }
    u256_math::to_display_string(
        position.health_factor_raw,
        WAD_DECIMALS,
        precision::HEALTH_FACTOR,
    )
}

/// USD value of the deposited collateral.
pub fn collateral_usd_value(
    position: &PositionSnapshot,
    price: &PriceFeedSnapshot,
) -> Result<U256, MathError> {
    u256_math::to_usd_value(position.collateral_deposited, price.answer, price.decimals)
}

/// Additional DSC mintable before hitting the LTV ceiling.
///
/// Zero without collateral, and zero once the two-decimal health factor is
/// at or below 1.00.
pub fn borrowing_power(
    position: &PositionSnapshot,
    price: &PriceFeedSnapshot,
) -> Result<BorrowingPower, MathError> {
    if position.collateral_deposited.is_zero() {
        return Ok(BorrowingPower::Available(U256::ZERO));
    }

    if health_factor_hundredths(position) <= U256::from(100u64) {
        return Ok(BorrowingPower::Available(U256::ZERO));
    }

    let collateral_usd = collateral_usd_value(position, price)?;
    let max_mint = u256_math::mul_div(
        collateral_usd,
        U256::from(MAX_LTV_PERCENT),
        U256::from(100u64),
        "max mint",
    )?;

    Ok(match max_mint.checked_sub(position.dsc_minted) {
        Some(available) => BorrowingPower::Available(available),
        None => BorrowingPower::Exhausted {
            shortfall: position.dsc_minted - max_mint,
        },
    })
}

/// Collateral price (USD per unit, 18 decimals) at which the health factor
/// would reach the protocol minimum.
///
/// Follows the engine's order of operations step by step, multiplying
/// before dividing each time.
pub fn liquidation_price(
    position: &PositionSnapshot,
    constants: &ProtocolConstants,
) -> Result<U256, MathError> {
    if position.collateral_deposited.is_zero() {
        return Ok(U256::ZERO);
    }

    let min_hf_less_one = constants
        .minimum_health_factor
        .checked_sub(U256::from(1u64))
        .ok_or(MathError::Underflow {
            op: "minimum health factor",
        })?;

    let collateral_adjusted_for_threshold = u256_math::mul_div(
        min_hf_less_one,
        position.dsc_minted,
        constants.precision,
        "threshold adjustment",
    )?;

    let collateral_usd_at_liquidation = u256_math::mul_div(
        collateral_adjusted_for_threshold,
        constants.liquidation_precision,
        constants.liquidation_threshold,
        "collateral usd at liquidation",
    )?;

    u256_math::mul_div(
        collateral_usd_at_liquidation,
        constants.precision,
        position.collateral_deposited,
        "liquidation price",
    )
}

/// Compute every display metric for one position.
pub fn user_stats(
    position: &PositionSnapshot,
    price: &PriceFeedSnapshot,
    constants: &ProtocolConstants,
) -> Result<UserStats, MathError> {
    let collateral_usd = collateral_usd_value(position, price)?;
    let borrowing_power = borrowing_power(position, price)?;
    let liquidation_price = liquidation_price(position, constants)?;

    if let BorrowingPower::Exhausted { shortfall } = borrowing_power {
        tracing::debug!(shortfall = %shortfall, "Position above LTV ceiling");
    }

    Ok(UserStats {
        health_factor: health_factor_display(position),
        collateral: u256_math::to_display_string(
            position.collateral_deposited,
            WAD_DECIMALS,
            precision::COLLATERAL,
        ),
        collateral_usd: u256_math::to_display_string(
            collateral_usd,
            WAD_DECIMALS,
            precision::COLLATERAL_USD,
        ),
        debt: u256_math::to_display_string(position.dsc_minted, WAD_DECIMALS, precision::DEBT),
        borrowing_power: u256_math::to_display_string(
            borrowing_power.clamped(),
            WAD_DECIMALS,
            precision::BORROWING_POWER,
        ),
        liquidation_price: u256_math::to_display_string(
            liquidation_price,
            WAD_DECIMALS,
            precision::LIQUIDATION_PRICE,
        ),
    })
}
