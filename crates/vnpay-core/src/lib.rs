//! # VNPay Core
//!
//! Pure primitives for talking to the VNPay payment gateway: parameter sets,
//! canonical encoding, HMAC-SHA512 signing, and the invoice model.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! deterministic computation over strings and amounts.
//!
//! ## Key Types
//!
//! - [`ParamSet`] - Name/value map, always iterated in byte order
//! - [`SecureHash`] - HMAC-SHA512 digest over a canonical string
//! - [`Invoice`] - The merchant-side record a payment is reconciled against
//! - [`PaymentStatus`] - Invoice state and its allowed transitions
//!
//! ## Canonicalization
//!
//! Every signature is computed over the string produced by
//! [`canonical::canonical_string`]. The same function builds outbound query
//! strings, so the bytes that are hashed are the bytes that are sent.

pub mod amount;
pub mod canonical;
pub mod error;
pub mod invoice;
pub mod params;
pub mod response;
pub mod signing;
pub mod status;
pub mod time;

pub use amount::{from_minor_units, parse_minor_units, to_minor_units, Amounts};
pub use canonical::{canonical_string, parse_query, pipe_joined, SpaceEncoding};
pub use error::{CoreError, Result};
pub use invoice::{
    format_invoice_number, payment_notes, GatewayFields, Invoice, InvoiceId, NewInvoice, TxnRef,
};
pub use params::{fields, ParamSet};
pub use response::{describe_response_code, RESPONSE_SUCCESS};
pub use signing::{sign, sign_params, verify, verify_params, SecureHash};
pub use status::{PaymentMethod, PaymentStatus};
pub use time::{format_gateway_time, parse_gateway_time, DEFAULT_UTC_OFFSET_SECS};
