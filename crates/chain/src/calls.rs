//! Write-call descriptors.
//!
//! A [`ContractCall`] names one protocol operation and its amounts. It is
//! turned into `(to, calldata, value)` only at submission time, so the
//! orchestration layer can plan and test call sequences without an ABI.

use crate::contracts::{ContractAddresses, IDSCEngine, IDecentralizedStableCoin};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use std::fmt;

/// One submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractCall {
    /// Deposit native collateral
    Deposit { amount: U256 },
    /// Mint DSC against existing collateral
    Mint { amount: U256 },
    /// Deposit collateral and mint DSC in one call
    DepositAndMint { deposit: U256, mint: U256 },
    /// Redeem collateral
    Redeem { amount: U256 },
    /// Burn DSC
    Burn { amount: U256 },
    /// Approve the engine to pull DSC
    ApproveStable { amount: U256 },
    /// Burn DSC and redeem collateral in one call
    BurnAndRedeem { burn: U256, redeem: U256 },
}

/// Encoded transaction request parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCall {
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
}

impl ContractCall {
    /// Short operation name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deposit { .. } => "deposit",
            Self::Mint { .. } => "mint",
            Self::DepositAndMint { .. } => "depositAndMint",
            Self::Redeem { .. } => "redeem",
            Self::Burn { .. } => "burn",
            Self::ApproveStable { .. } => "approve",
            Self::BurnAndRedeem { .. } => "burnAndRedeem",
        }
    }

    /// Whether this call only grants an allowance for a later call.
    pub fn is_approval(&self) -> bool {
        matches!(self, Self::ApproveStable { .. })
    }

    /// Encode against the deployed addresses.
    pub fn encode(&self, addresses: &ContractAddresses) -> EncodedCall {
        let engine = |input: Vec<u8>, value: U256| EncodedCall {
            to: addresses.engine,
            input: Bytes::from(input),
            value,
        };

        match *self {
            Self::Deposit { amount } => engine(IDSCEngine::depositCall {}.abi_encode(), amount),
            Self::Mint { amount } => {
                engine(IDSCEngine::mintCall { amount }.abi_encode(), U256::ZERO)
            }
            Self::DepositAndMint { deposit, mint } => engine(
                IDSCEngine::depositAndMintCall { mintAmount: mint }.abi_encode(),
                deposit,
            ),
            Self::Redeem { amount } => {
                engine(IDSCEngine::redeemCall { amount }.abi_encode(), U256::ZERO)
            }
            Self::Burn { amount } => {
                engine(IDSCEngine::burnCall { amount }.abi_encode(), U256::ZERO)
            }
            Self::BurnAndRedeem { burn, redeem } => engine(
                IDSCEngine::burnAndRedeemCall {
                    burnAmount: burn,
                    redeemAmount: redeem,
                }
                .abi_encode(),
                U256::ZERO,
            ),
            Self::ApproveStable { amount } => EncodedCall {
                to: addresses.stable_coin,
                input: Bytes::from(
                    IDecentralizedStableCoin::approveCall {
                        spender: addresses.engine,
                        amount,
                    }
                    .abi_encode(),
                ),
                value: U256::ZERO,
            },
        }
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit { amount }
            | Self::Mint { amount }
            | Self::Redeem { amount }
            | Self::Burn { amount }
            | Self::ApproveStable { amount } => write!(f, "{}({})", self.name(), amount),
            Self::DepositAndMint { deposit, mint } => {
                write!(f, "depositAndMint(deposit={}, mint={})", deposit, mint)
            }
            Self::BurnAndRedeem { burn, redeem } => {
                write!(f, "burnAndRedeem(burn={}, redeem={})", burn, redeem)
            }
        }
    }
}
