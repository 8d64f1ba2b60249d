//! Output sink for everything the core wants shown.

use std::fmt::Debug;
use tracing::{debug, info, warn};

use crate::errors::ErrorMessage;
use crate::metrics::UserStats;
use crate::stats::ProtocolStats;
use crate::transaction::TransactionState;

/// Receives display updates. Implementations only render; they never call
/// back into the core.
pub trait Presenter: Send + Sync + Debug {
    fn user_stats(&self, stats: &UserStats);

    fn protocol_stats(&self, stats: &ProtocolStats);

    fn transaction_state(&self, state: &TransactionState);

    /// Update the form's error line.
    fn error_message(&self, message: &ErrorMessage);

    /// Enable or disable the execute control.
    fn execute_enabled(&self, enabled: bool);
}

/// Presenter that writes every update to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn user_stats(&self, stats: &UserStats) {
        info!(
            health_factor = %stats.health_factor,
            collateral = %stats.collateral,
            collateral_usd = %stats.collateral_usd,
            debt = %stats.debt,
            borrowing_power = %stats.borrowing_power,
            liquidation_price = %stats.liquidation_price,
            "Position"
        );
    }

    fn protocol_stats(&self, stats: &ProtocolStats) {
        info!(source = ?stats.source, values = ?stats.values, "Protocol stats");
    }

    fn transaction_state(&self, state: &TransactionState) {
        info!(state = state.name(), "Transaction state");
    }

    fn error_message(&self, message: &ErrorMessage) {
        if let ErrorMessage::Show(text) = message {
            warn!("{}", text);
        }
    }

    fn execute_enabled(&self, enabled: bool) {
        debug!(enabled, "Execute control");
    }
}
