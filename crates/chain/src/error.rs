//! Failure signals produced by the chain layer.
//!
//! Provider errors are reduced to a small set of shapes that carry exactly
//! what classification needs: a user-rejection flag, revert bytes (or the
//! submitted calldata when the node returned none), or a message.

use alloy::primitives::{Bytes, B256};
use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC code used by nodes for `execution reverted`.
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Short message attached when a revert came back without data.
pub const MISSING_REVERT_DATA: &str = "missing revert data";

/// Failure of a chain read or write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("user rejected the request")]
    UserRejected,

    #[error("call exception: {short_message}")]
    CallException {
        short_message: String,
        /// Revert data returned by the node
        data: Option<Bytes>,
        /// Calldata of the failed request
        transaction_data: Option<Bytes>,
    },

    #[error("transaction reverted: {hash}")]
    Reverted { hash: B256 },

    #[error("{message}")]
    Other { message: String },
}

impl ChainError {
    /// Wrap any message as an unstructured failure.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Map a transport error. `calldata` is the input of the request that
    /// failed, if it was a call or transaction.
    pub fn from_rpc(err: &RpcError<TransportErrorKind>, calldata: Option<&Bytes>) -> Self {
        let Some(payload) = err.as_error_resp() else {
            return Self::other(err.to_string());
        };

        if payload.code == USER_REJECTED_CODE {
            return Self::UserRejected;
        }

        let message = payload.message.to_string();
        let is_revert = payload.code == EXECUTION_REVERTED_CODE
            || message.to_lowercase().contains("revert");

        if !is_revert {
            return Self::Other { message };
        }

        match payload.as_revert_data() {
            Some(data) if !data.is_empty() => Self::CallException {
                short_message: message,
                data: Some(data),
                transaction_data: calldata.cloned(),
            },
            _ => Self::CallException {
                short_message: format!("{} ({})", MISSING_REVERT_DATA, message),
                data: None,
                transaction_data: calldata.cloned(),
            },
        }
    }

    /// Map a contract-call error from a typed `sol!` binding.
    pub fn from_contract(err: alloy::contract::Error, calldata: Option<&Bytes>) -> Self {
        match err {
            alloy::contract::Error::TransportError(e) => Self::from_rpc(&e, calldata),
            other => Self::other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::json_rpc::ErrorPayload;
    use serde_json::value::RawValue;

    fn resp(code: i64, message: &'static str, data: Option<&str>) -> RpcError<TransportErrorKind> {
        RpcError::ErrorResp(ErrorPayload {
            code,
            message: message.into(),
            data: data.map(|d| RawValue::from_string(d.to_string()).unwrap()),
        })
    }

    #[test]
    fn test_user_rejection() {
        let err = resp(USER_REJECTED_CODE, "User denied transaction signature", None);
        assert_eq!(ChainError::from_rpc(&err, None), ChainError::UserRejected);
    }

    #[test]
    fn test_revert_with_data() {
        let err = resp(3, "execution reverted", Some("\"0xcd80f490\""));
        match ChainError::from_rpc(&err, None) {
            ChainError::CallException { data, .. } => {
                assert_eq!(data.unwrap().as_ref(), &[0xcd, 0x80, 0xf4, 0x90]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_revert_without_data_keeps_calldata() {
        let calldata = Bytes::from(vec![0xd0, 0xe3, 0x0d, 0xb0]);
        let err = resp(-32000, "execution reverted", None);
        match ChainError::from_rpc(&err, Some(&calldata)) {
            ChainError::CallException {
                short_message,
                data,
                transaction_data,
            } => {
                assert!(short_message.contains(MISSING_REVERT_DATA));
                assert!(data.is_none());
                assert_eq!(transaction_data, Some(calldata));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_other_rpc_error() {
        let err = resp(-32603, "internal error", None);
        assert!(matches!(
            ChainError::from_rpc(&err, None),
            ChainError::Other { .. }
        ));
    }
}
