//! Contract interfaces for the DSC protocol.
//!
//! Inline `sol!` definitions covering the subset of each ABI the client
//! touches: position and aggregate reads on the engine, the stable coin's
//! ERC20 approval, and the Chainlink-style collateral price feed.

use alloy::primitives::Address;
use alloy::sol;

sol! {
    /// DSCEngine: collateral vault and stable-coin minter.
    #[sol(rpc)]
    #[derive(Debug)]
    interface IDSCEngine {
        function getPositionInfo(address user) external view returns (
            uint256 _collateralDeposited,
            uint256 _dscMinted,
            uint256 _healthFactor
        );

        function MINIMUM_HEALTH_FACTOR() external view returns (uint256);
        function PRECISION() external view returns (uint256);
        function LIQUIDATION_THRESHOLD() external view returns (uint256);
        function LIQUIDATION_PRECISION() external view returns (uint256);

        function getTotalDepositedCollateral() external view returns (uint256);
        function getDSCSupply() external view returns (uint256);

        function deposit() external payable;
        function mint(uint256 amount) external;
        function depositAndMint(uint256 mintAmount) external payable;
        function burn(uint256 amount) external;
        function redeem(uint256 amount) external;
        function burnAndRedeem(uint256 burnAmount, uint256 redeemAmount) external;

        event Liquidated(
            address indexed _user,
            address indexed _liquidator,
            uint256 _collateralSold,
            uint256 _debtCovered
        );
    }
}

sol! {
    /// The pegged stable coin (ERC20 subset).
    #[sol(rpc)]
    #[derive(Debug)]
    interface IDecentralizedStableCoin {
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

sol! {
    /// Chainlink AggregatorV3 price feed.
    #[sol(rpc)]
    #[derive(Debug)]
    interface IAggregatorV3 {
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );

        function decimals() external view returns (uint8);
    }
}

/// Deployed contract addresses for one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    /// DSCEngine
    pub engine: Address,
    /// DecentralizedStableCoin token
    pub stable_coin: Address,
    /// Collateral/USD price feed
    pub price_feed: Address,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::{SolCall, SolEvent};

    #[test]
    fn test_deposit_selector() {
        // The native-deposit selector doubles as the "insufficient funds"
        // signature when a deposit reverts without data.
        assert_eq!(hex::encode(IDSCEngine::depositCall::SELECTOR), "d0e30db0");
    }

    #[test]
    fn test_fused_call_encoding() {
        let call = IDSCEngine::burnAndRedeemCall {
            burnAmount: alloy::primitives::U256::from(5u64),
            redeemAmount: alloy::primitives::U256::from(1u64),
        };
        // selector + two words
        assert_eq!(call.abi_encode().len(), 4 + 64);
    }

    #[test]
    fn test_liquidated_signature() {
        assert!(!IDSCEngine::Liquidated::SIGNATURE_HASH.is_zero());
    }
}
