//! DSC chain interaction layer.
//!
//! This crate provides:
//! - The [`ChainClient`] abstraction the core reads and writes through
//! - Snapshot types for positions, oracle rounds and protocol constants
//! - [`ContractCall`] descriptors for every write the client issues
//! - [`ChainError`] failure signals mapped from JSON-RPC error payloads
//! - An Alloy-backed HTTP implementation with inline contract bindings

mod calls;
mod client;
pub mod contracts;
mod error;
mod provider;
mod types;

pub use calls::{ContractCall, EncodedCall};
pub use client::ChainClient;
pub use contracts::ContractAddresses;
pub use error::{ChainError, EXECUTION_REVERTED_CODE, MISSING_REVERT_DATA, USER_REJECTED_CODE};
pub use provider::AlloyChainClient;
pub use types::{
    AggregateMetric, LiquidationEvent, PositionSnapshot, PriceFeedSnapshot, ProtocolConstants,
};
