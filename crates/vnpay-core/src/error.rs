//! Error types for VNPay Core.

use thiserror::Error;

/// Errors raised while preparing values for the gateway.
///
/// Signature mismatches are not errors: [`crate::verify`] returns `false`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount out of range for minor-unit conversion")]
    AmountOutOfRange,

    #[error("invalid gateway timestamp {value:?}: expected yyyyMMddHHmmss")]
    InvalidTimestamp { value: String },

    #[error("invalid UTC offset: {0} seconds")]
    InvalidOffset(i32),

    #[error("unknown payment status: {0}")]
    UnknownStatus(String),

    #[error("unknown payment method: {0}")]
    UnknownMethod(String),

    #[error("invalid invoice id: {0}")]
    InvalidInvoiceId(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
