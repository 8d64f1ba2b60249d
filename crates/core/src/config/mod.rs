//! Configuration for the DSC client.
//!
//! This module provides:
//! - Client runtime configuration (profiles, stats cache, confirmations)
//! - Supported network table (chain ids, default RPC endpoints)
//! - Deployed contract addresses keyed by chain id

mod client;
mod deployment;
mod network;

pub use client::{
    ClientConfig, StatsConfig, TransactionConfig, CONFIG_PATH_ENV, PROFILE_ENV,
};
pub use deployment::{ChainAddresses, DeploymentAddresses};
pub use network::{network_config, NetworkConfig, NETWORKS};
