//! Exact U256 fixed-point arithmetic for position metrics.
//!
//! Every financial value is an integer scaled by 10^18 (WAD). Division is
//! floor division, matching the engine's own arithmetic so displayed values
//! never overstate collateral or solvency. Nothing here touches `f64`.

use alloy::primitives::U256;
use thiserror::Error;

/// WAD constant: 1e18 for 18-decimal fixed-point arithmetic
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Decimals of a WAD-scaled value.
pub const WAD_DECIMALS: u8 = 18;

/// Pre-computed powers of 10 for fast decimal conversion
const POW10: [u128; 39] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
    10_000_000_000_000_000_000,
    100_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000_000,
];

/// Arithmetic contract violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("price decimals {decimals} exceed 18")]
    PriceDecimalsOutOfRange { decimals: u8 },

    #[error("overflow in {op}")]
    Overflow { op: &'static str },

    #[error("underflow in {op}")]
    Underflow { op: &'static str },

    #[error("division by zero in {op}")]
    DivisionByZero { op: &'static str },

    #[error("invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: &'static str },
}

/// Fast power of 10 lookup (up to 10^38)
#[inline(always)]
pub fn pow10(exp: u8) -> U256 {
    if exp < 39 {
        U256::from(POW10[exp as usize])
    } else {
        U256::from(10u64).pow(U256::from(exp))
    }
}

/// `a * b / denominator` with floor division; multiplication happens first.
#[inline]
pub fn mul_div(a: U256, b: U256, denominator: U256, op: &'static str) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero { op });
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow { op })?;
    Ok(product / denominator)
}

/// Value of `amount` (18 decimals) at `price` (`price_decimals` decimals),
/// as an 18-decimal USD amount.
///
/// The price is first normalized to 18 decimals, then
/// `amount * normalized / 1e18` is taken with floor division.
pub fn to_usd_value(amount: U256, price: U256, price_decimals: u8) -> Result<U256, MathError> {
    if price_decimals > WAD_DECIMALS {
        return Err(MathError::PriceDecimalsOutOfRange {
            decimals: price_decimals,
        });
    }

    let normalized_price = price
        .checked_mul(pow10(WAD_DECIMALS - price_decimals))
        .ok_or(MathError::Overflow {
            op: "price normalization",
        })?;

    mul_div(amount, normalized_price, WAD, "usd value")
}

/// Drop the digits of `amount` (scaled by `10^decimals`) beyond `precision`
/// fractional digits, returning the integer scaled by `10^precision`.
///
/// `truncate_to_precision(1_234_567e12, 18, 2) == 123` (i.e. 1.23).
#[inline]
pub fn truncate_to_precision(amount: U256, decimals: u8, precision: u8) -> U256 {
    if precision >= decimals {
        amount * pow10(precision - decimals)
    } else {
        amount / pow10(decimals - precision)
    }
}

/// Decimal string of `amount` (scaled by `10^decimals`) with exactly
/// `precision` fractional digits. Extra digits are truncated, never rounded.
pub fn to_display_string(amount: U256, decimals: u8, precision: u8) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;

    let (integer, fraction) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };

    if precision == 0 {
        return integer;
    }

    let precision = precision as usize;
    let mut fraction: String = fraction.chars().take(precision).collect();
    while fraction.len() < precision {
        fraction.push('0');
    }

    format!("{}.{}", integer, fraction)
}

/// Parse a decimal string (`"1.5"`) into an 18-decimal integer.
pub fn parse_wad(input: &str) -> Result<U256, MathError> {
    let trimmed = input.trim();
    let invalid = |reason| MathError::InvalidAmount {
        input: input.to_string(),
        reason,
    };

    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }

    let (integer, fraction) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };

    if integer.is_empty() && fraction.is_empty() {
        return Err(invalid("no digits"));
    }
    if !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a decimal number"));
    }
    if fraction.len() > WAD_DECIMALS as usize {
        return Err(invalid("more than 18 fractional digits"));
    }

    let integer = if integer.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(integer, 10).map_err(|_| invalid("out of range"))?
    };
    let fraction = if fraction.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(fraction, 10).map_err(|_| invalid("out of range"))?
            * pow10(WAD_DECIMALS - fraction.len() as u8)
    };

    integer
        .checked_mul(WAD)
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(|| invalid("out of range"))
}
