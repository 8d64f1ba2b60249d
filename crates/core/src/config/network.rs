//! Supported networks.

use serde::Serialize;

/// Static description of one supported chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: &'static str,
    /// Default public RPC endpoint
    pub rpc_url: &'static str,
    /// Block explorer base URL (none for local chains)
    pub block_explorer: Option<&'static str>,
}

/// Every chain the client can connect to.
pub const NETWORKS: [NetworkConfig; 3] = [
    NetworkConfig {
        chain_id: 31337,
        name: "Ethereum Anvil",
        rpc_url: "http://127.0.0.1:8545",
        block_explorer: None,
    },
    NetworkConfig {
        chain_id: 11155111,
        name: "Ethereum Sepolia",
        rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
        block_explorer: Some("https://sepolia.etherscan.io/"),
    },
    NetworkConfig {
        chain_id: 421614,
        name: "Arbitrum Sepolia",
        rpc_url: "https://arbitrum-sepolia-rpc.publicnode.com",
        block_explorer: Some("https://sepolia.arbiscan.io/"),
    },
];

/// Look up a supported chain.
pub fn network_config(chain_id: u64) -> anyhow::Result<&'static NetworkConfig> {
    tracing::debug!(chain_id, "Resolving network configuration");
    NETWORKS
        .iter()
        .find(|network| network.chain_id == chain_id)
        .ok_or_else(|| anyhow::anyhow!("Could not find configuration for chain {}", chain_id))
}

impl NetworkConfig {
    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, hash: &str) -> Option<String> {
        self.block_explorer
            .map(|base| format!("{}tx/{}", base, hash))
    }
}
