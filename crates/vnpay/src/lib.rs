//! # VNPay
//!
//! The unified API for taking payments through the VNPay gateway: signed
//! redirect URLs, signed merchant-API requests, and callback reconciliation
//! against a merchant invoice store.
//!
//! ## Overview
//!
//! - **Payments**: An invoice is stored `Pending` first, then a signed
//!   redirect URL is built for it
//! - **Callbacks**: Return and IPN parameters are verified and reconciled
//!   against the invoice exactly once
//! - **Queries and refunds**: Signed parameter sets for the merchant web API
//!
//! ## Key Concepts
//!
//! - **TxnRef**: The merchant reference binding a gateway transaction to one invoice.
//! - **Canonical string**: Byte-sorted, percent-encoded `key=value` pairs; the
//!   only thing ever signed.
//! - **Conditional update**: A status write that only lands if the invoice is
//!   still in the expected status. Replays and races become no-ops.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rust_decimal::Decimal;
//! use vnpay::{Gateway, GatewayConfig, PaymentRequest};
//! use vnpay::store::SqliteInvoiceStore;
//!
//! async fn example() -> vnpay::Result<()> {
//!     let store = SqliteInvoiceStore::open("invoices.db")?;
//!     let gateway = Gateway::new(store, GatewayConfig::from_env()?);
//!
//!     let payment = gateway
//!         .create_payment(PaymentRequest::new("cust-1", "ticket-9", Decimal::from(100_000), "203.0.113.7"))
//!         .await?;
//!     println!("redirect to {}", payment.payment_url);
//!
//!     // Later, in the IPN handler:
//!     // let ack = gateway.ipn_ack(params).await;
//!     // respond with ack.to_json()
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `vnpay::core` - Encoding, signing, amounts and the invoice model
//! - `vnpay::store` - Invoice storage abstraction, in-memory and SQLite

pub mod callback;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ids;
pub mod reconcile;
pub mod requests;

// Re-export component crates
pub use vnpay_core as core;
pub use vnpay_store as store;

// Re-export main types for convenience
pub use callback::{CallbackPayload, IpnAck, ReturnOutcome, ReturnResult};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ApiChecksum, GatewayConfig, RefundPolicy};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, PreparedRefund};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use reconcile::IpnOutcome;
pub use requests::{
    CreatedPayment, PaymentRequest, QueryRequest, RefundKind, RefundRequest, SignedRequest,
};

// Re-export commonly used core types
pub use vnpay_core::{
    Invoice, InvoiceId, ParamSet, PaymentMethod, PaymentStatus, SpaceEncoding, TxnRef,
};
