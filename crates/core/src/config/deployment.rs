//! Deployed contract addresses per chain.
//!
//! The addresses file is a TOML table keyed by chain id:
//!
//! ```toml
//! [31337]
//! DSCEngine = "0x..."
//! DSC = "0x..."
//! ethUsdPriceFeed = "0x..."
//! ```

use alloy::primitives::Address;
use anyhow::{Context, Result};
use dsc_chain::ContractAddresses;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Address entries for one chain, as written in the addresses file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAddresses {
    #[serde(rename = "DSCEngine", default)]
    pub engine: Option<String>,
    #[serde(rename = "DSC", default)]
    pub stable_coin: Option<String>,
    #[serde(rename = "ethUsdPriceFeed", default)]
    pub price_feed: Option<String>,
}

/// Every known deployment, keyed by chain id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentAddresses {
    chains: BTreeMap<String, ChainAddresses>,
}

impl DeploymentAddresses {
    /// Load the addresses file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read addresses file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse addresses file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a single deployment from `DSC_ENGINE_ADDRESS`, `DSC_ADDRESS`
    /// and `ETH_USD_PRICE_FEED_ADDRESS`.
    pub fn from_env(chain_id: u64) -> Self {
        let entry = ChainAddresses {
            engine: std::env::var("DSC_ENGINE_ADDRESS").ok(),
            stable_coin: std::env::var("DSC_ADDRESS").ok(),
            price_feed: std::env::var("ETH_USD_PRICE_FEED_ADDRESS").ok(),
        };
        let mut chains = BTreeMap::new();
        chains.insert(chain_id.to_string(), entry);
        Self { chains }
    }

    /// Resolve and parse the addresses of `chain_id`.
    pub fn resolve(&self, chain_id: u64) -> Result<ContractAddresses> {
        let entry = self.chains.get(&chain_id.to_string()).ok_or_else(|| {
            anyhow::anyhow!("Network configuration for chain id {} not found", chain_id)
        })?;

        let addresses = ContractAddresses {
            engine: parse_entry(entry.engine.as_deref(), "DSCEngine", chain_id)?,
            stable_coin: parse_entry(entry.stable_coin.as_deref(), "DSC", chain_id)?,
            price_feed: parse_entry(entry.price_feed.as_deref(), "ethUsdPriceFeed", chain_id)?,
        };

        info!(
            chain_id,
            engine = %addresses.engine,
            stable_coin = %addresses.stable_coin,
            price_feed = %addresses.price_feed,
            "Resolved contract addresses"
        );
        Ok(addresses)
    }
}

fn parse_entry(raw: Option<&str>, name: &str, chain_id: u64) -> Result<Address> {
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!("Contract {} not found in configuration for chain {}", name, chain_id)
        })?;
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid {} address for chain {}: {}", name, chain_id, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [31337]
        DSCEngine = "0x1111111111111111111111111111111111111111"
        DSC = "0x2222222222222222222222222222222222222222"
        ethUsdPriceFeed = "0x3333333333333333333333333333333333333333"

        [11155111]
        DSCEngine = "0x4444444444444444444444444444444444444444"
    "#;

    #[test]
    fn test_resolve() {
        let deployments = DeploymentAddresses::from_toml(SAMPLE).unwrap();
        let addresses = deployments.resolve(31337).unwrap();
        assert_eq!(addresses.engine, Address::repeat_byte(0x11));
        assert_eq!(addresses.stable_coin, Address::repeat_byte(0x22));
        assert_eq!(addresses.price_feed, Address::repeat_byte(0x33));
    }

    #[test]
    fn test_unknown_chain() {
        let deployments = DeploymentAddresses::from_toml(SAMPLE).unwrap();
        let err = deployments.resolve(421614).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Network configuration for chain id 421614 not found"
        );
    }

    #[test]
    fn test_missing_contract() {
        let deployments = DeploymentAddresses::from_toml(SAMPLE).unwrap();
        let err = deployments.resolve(11155111).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Contract DSC not found in configuration for chain 11155111"
        );
    }

    #[test]
    fn test_invalid_address() {
        let deployments = DeploymentAddresses::from_toml(
            r#"
            [1]
            DSCEngine = "0x1234"
            DSC = "0x2222222222222222222222222222222222222222"
            ethUsdPriceFeed = "0x3333333333333333333333333333333333333333"
            "#,
        )
        .unwrap();
        let err = deployments.resolve(1).unwrap_err();
        assert!(err.to_string().contains("Invalid DSCEngine address"));
    }
}
