//! Error types for the gateway.

use std::time::Duration;

use thiserror::Error;
use vnpay_core::{CoreError, PaymentStatus};
use vnpay_store::StoreError;

/// Errors that can occur during gateway operations.
///
/// Signature mismatches, unknown orders on a callback and replayed callbacks
/// are ordinary outcomes, not errors. See [`crate::IpnOutcome`] and
/// [`crate::ReturnOutcome`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A store call did not finish in time.
    #[error("store {operation} timed out after {timeout:?}")]
    StoreTimeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// No invoice matches the given TxnRef or id.
    #[error("invoice not found: {0}")]
    InvoiceNotFound(String),

    /// The caller's input was rejected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The invoice is not in a status the operation can move it from.
    #[error("invoice {txn_ref} cannot move from {from} to {to}")]
    InvalidTransition {
        txn_ref: String,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Encoding, amount or timestamp error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Whether the failure is infrastructural and the same call may succeed
    /// later. Protocol rejections are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => !matches!(
                e,
                StoreError::DuplicateTxnRef(_) | StoreError::InvalidData(_)
            ),
            Self::StoreTimeout { .. } => true,
            _ => false,
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let timeout = GatewayError::StoreTimeout {
            operation: "get_by_txn_ref",
            timeout: Duration::from_secs(5),
        };
        assert!(timeout.is_retryable());
        assert!(GatewayError::Store(StoreError::Task("join".into())).is_retryable());
        assert!(GatewayError::Store(StoreError::LockPoisoned("p".into())).is_retryable());

        assert!(!GatewayError::Store(StoreError::DuplicateTxnRef("1".into())).is_retryable());
        assert!(!GatewayError::InvoiceNotFound("1".into()).is_retryable());
        assert!(!GatewayError::InvalidRequest("x".into()).is_retryable());
        assert!(!GatewayError::Core(CoreError::AmountOutOfRange).is_retryable());
    }
}
