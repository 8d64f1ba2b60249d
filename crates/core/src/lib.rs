//! DSC client core.
//!
//! This crate provides the computation and orchestration behind the client:
//! - Exact 18-decimal fixed-point math and display formatting
//! - Position risk metrics (health factor, borrowing power, liquidation price)
//! - Protocol-wide stats with a single-slot TTL cache and stale fallback
//! - Transaction flows with an explicit state machine and confirmation waits
//! - Classification of revert data into user-facing errors
//!
//! Chain access goes through [`dsc_chain::ChainClient`]; display goes
//! through [`Presenter`].

mod clock;
pub mod config;
mod errors;
pub mod metrics;
mod presenter;
mod session;
pub mod stats;
mod store;
mod transaction;
pub mod u256_math;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, SystemClock};
pub use config::{
    network_config, ClientConfig, DeploymentAddresses, NetworkConfig, StatsConfig,
    TransactionConfig,
};
pub use errors::{
    classify, Classification, CoreError, ErrorKind, ErrorMessage, INSUFFICIENT_DSC_BALANCE,
};
pub use metrics::{BorrowingPower, UserStats};
pub use presenter::{Presenter, TracingPresenter};
pub use session::{FlowGuard, Session};
pub use stats::{ProtocolMetric, ProtocolStats, ProtocolStatsAggregator, StatsSource};
pub use store::{CachedStats, FileStatsStore, MemoryStatsStore, StatsStore, STATS_CACHE_KEY};
pub use transaction::{
    plan_calls, TransactionEvent, TransactionIntent, TransactionKind, TransactionOrchestrator,
    TransactionOutcome, TransactionState,
};
pub use u256_math::MathError;
