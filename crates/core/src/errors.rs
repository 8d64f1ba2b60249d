//! Error taxonomy and failure classification.
//!
//! Failures from the chain layer are mapped onto a closed set of
//! [`ErrorKind`]s, each carrying what the form should show and whether the
//! execute control comes back.

use alloy::primitives::Bytes;
use dsc_chain::{ChainError, MISSING_REVERT_DATA};
use thiserror::Error;
use tracing::{error, warn};

use crate::transaction::TransactionKind;
use crate::u256_math::MathError;

/// Message surfaced for a burn above the outstanding debt. Also raised
/// locally by pre-submission checks, and recognized again on re-display.
pub const INSUFFICIENT_DSC_BALANCE: &str = "Error: Insufficient DSC balance.";

/// User-facing failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UserRejected,
    InsufficientFunds,
    HealthFactorViolation,
    InsufficientProtocolBalance,
    InsufficientDebt,
    RedeemFailed,
    TransferFailed,
    /// Silent: clears any message
    NotLiquidatable,
    ZeroAmount,
    OracleStale,
    UnknownCallException,
    UnknownFailure,
    /// Protocol stats refresh failed (never blocking)
    AggregationFailed,
}

/// What the form's error line should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorMessage {
    /// Leave the current text alone
    Keep,
    /// Blank it
    Clear,
    /// Replace it
    Show(String),
}

/// Outcome of classifying one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub message: ErrorMessage,
    /// Whether the execute control is re-enabled
    pub reenable: bool,
}

/// A known revert selector.
#[derive(Debug, Clone, Copy)]
struct SelectorEntry {
    selector: [u8; 4],
    /// Revert name, for logs
    name: &'static str,
    kind: ErrorKind,
    /// `None` clears the message
    message: Option<&'static str>,
}

/// Revert selectors raised by the engine and its oracle library.
const SELECTOR_TABLE: [SelectorEntry; 9] = [
    // deposit() calldata: a native deposit reverted without data
    SelectorEntry {
        selector: [0xd0, 0xe3, 0x0d, 0xb0],
        name: "deposit",
        kind: ErrorKind::InsufficientFunds,
        message: Some("Error: Insufficient funds."),
    },
    SelectorEntry {
        selector: [0xcd, 0x80, 0xf4, 0x90],
        name: "DSCEngine__BrokenHealthFactor",
        kind: ErrorKind::HealthFactorViolation,
        message: Some("Error: these amounts will break your health factor."),
    },
    SelectorEntry {
        selector: [0x8a, 0xe8, 0x4d, 0x91],
        name: "DSCEngine__InsufficientBalance",
        kind: ErrorKind::InsufficientProtocolBalance,
        message: Some("Error: Insufficient funds."),
    },
    SelectorEntry {
        selector: [0x1f, 0x38, 0xea, 0x1c],
        name: "DSCEngine__InsufficientDebt",
        kind: ErrorKind::InsufficientDebt,
        message: Some(INSUFFICIENT_DSC_BALANCE),
    },
    SelectorEntry {
        selector: [0x52, 0x63, 0x0d, 0xcd],
        name: "DSCEngine__RedeemFailed",
        kind: ErrorKind::RedeemFailed,
        message: Some("Error: Withdrawal failed."),
    },
    SelectorEntry {
        selector: [0x1d, 0xda, 0x5b, 0x64],
        name: "DSCEngine__TransferFromFailed",
        kind: ErrorKind::TransferFailed,
        message: Some("Error: Burn failed."),
    },
    SelectorEntry {
        selector: [0x89, 0x68, 0x02, 0x08],
        name: "DSCEngine__UserCannotBeLiquidated",
        kind: ErrorKind::NotLiquidatable,
        message: None,
    },
    SelectorEntry {
        selector: [0x3b, 0x6e, 0x17, 0x36],
        name: "DSCEngine__ZeroAmount",
        kind: ErrorKind::ZeroAmount,
        message: Some("Error: Cannot use zero amounts."),
    },
    SelectorEntry {
        selector: [0xc4, 0xa1, 0x09, 0x3a],
        name: "OracleLib__StalePrice",
        kind: ErrorKind::OracleStale,
        message: Some("Error: Oracle problem."),
    },
];

fn lookup_selector(data: &[u8]) -> Option<&'static SelectorEntry> {
    let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
    SELECTOR_TABLE.iter().find(|entry| entry.selector == selector)
}

/// Revert bytes to classify: when the node returned none, the request's
/// own calldata stands in for them.
fn revert_data<'a>(
    short_message: &str,
    data: Option<&'a Bytes>,
    transaction_data: Option<&'a Bytes>,
) -> Option<&'a Bytes> {
    if short_message.contains(MISSING_REVERT_DATA) {
        transaction_data
    } else {
        data
    }
}

/// Classify a failed submission or read.
pub fn classify(err: &ChainError) -> Classification {
    match err {
        ChainError::UserRejected => Classification {
            kind: ErrorKind::UserRejected,
            message: ErrorMessage::Keep,
            reenable: true,
        },

        ChainError::CallException {
            short_message,
            data,
            transaction_data,
        } => {
            let bytes = revert_data(short_message, data.as_ref(), transaction_data.as_ref());
            match bytes.and_then(|b| lookup_selector(b)) {
                Some(entry) => {
                    warn!(revert = entry.name, kind = ?entry.kind, "Call reverted");
                    Classification {
                        kind: entry.kind,
                        message: entry
                            .message
                            .map(|m| ErrorMessage::Show(m.to_string()))
                            .unwrap_or(ErrorMessage::Clear),
                        reenable: true,
                    }
                }
                None => {
                    error!(
                        short_message = %short_message,
                        data = ?bytes.map(hex::encode),
                        "Unrecognized call exception"
                    );
                    Classification {
                        kind: ErrorKind::UnknownCallException,
                        message: ErrorMessage::Keep,
                        reenable: true,
                    }
                }
            }
        }

        ChainError::Other { message } if message.contains(INSUFFICIENT_DSC_BALANCE) => {
            warn!(message = %message, "Insufficient DSC balance");
            Classification {
                kind: ErrorKind::InsufficientDebt,
                message: ErrorMessage::Show(INSUFFICIENT_DSC_BALANCE.to_string()),
                reenable: true,
            }
        }

        // Mined with status 0: a revert whose data the receipt does not carry
        ChainError::Reverted { hash } => {
            error!(hash = %hash, "Transaction reverted on chain");
            Classification {
                kind: ErrorKind::UnknownCallException,
                message: ErrorMessage::Keep,
                reenable: true,
            }
        }

        other => {
            error!(error = %other, "Unclassified transaction failure");
            Classification {
                kind: ErrorKind::UnknownFailure,
                message: ErrorMessage::Keep,
                reenable: false,
            }
        }
    }
}

/// Errors surfaced by the core to its caller.
///
/// Transaction failures on chain are not in here: they are classified and
/// reported through the presenter instead.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid transition from {from} on {event}")]
    InvalidTransition { from: &'static str, event: &'static str },

    #[error("another transaction is in flight")]
    FlowInFlight,

    #[error("execute control is disabled")]
    ExecuteDisabled,

    #[error("form is open for {expected:?}, got {actual:?}")]
    KindMismatch {
        expected: TransactionKind,
        actual: TransactionKind,
    },

    #[error("no account connected")]
    NoAccount,

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}
