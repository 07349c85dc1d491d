//! Shared setup for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use vnpay::core::{fields, sign_params};
use vnpay::store::{InvoiceStore, MemoryInvoiceStore};
use vnpay::{
    FixedClock, Gateway, GatewayConfig, ParamSet, PaymentRequest, SequentialIds, SpaceEncoding,
    TxnRef,
};

pub const TMN_CODE: &str = "TEST01";
pub const SECRET: &str = "SECRET";

/// 2024-01-01 00:00:00 UTC, 07:00 in gateway time.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn config() -> GatewayConfig {
    GatewayConfig::new(TMN_CODE, SECRET).with_return_url("https://shop.example.vn/vnpay/return")
}

/// A gateway over `store` with a fixed clock and sequential ids.
pub fn gateway_with<S: InvoiceStore>(store: S, config: GatewayConfig) -> Gateway<S> {
    Gateway::new(store, config)
        .with_ids(SequentialIds::default())
        .with_clock(Arc::new(FixedClock::new(epoch())))
}

pub fn memory_gateway() -> Gateway<MemoryInvoiceStore> {
    gateway_with(MemoryInvoiceStore::new(), config())
}

pub fn payment(amount: i64) -> PaymentRequest {
    PaymentRequest::new("cust-1", "ticket-1", Decimal::from(amount), "127.0.0.1")
}

/// Attach a valid `vnp_SecureHash` to `params`.
pub fn signed(mut params: ParamSet) -> ParamSet {
    let hash = sign_params(&params, SECRET.as_bytes(), SpaceEncoding::Percent20);
    params.insert(fields::SECURE_HASH, hash);
    params.insert(fields::SECURE_HASH_TYPE, "HmacSHA512");
    params
}

/// A signed callback as the gateway would send it.
pub fn callback(txn_ref: &TxnRef, amount_minor: &str, response_code: &str, status: &str) -> ParamSet {
    signed(
        ParamSet::new()
            .with(fields::AMOUNT, amount_minor)
            .with(fields::BANK_CODE, "NCB")
            .with(fields::ORDER_INFO, "Thanh toan cho don hang")
            .with(fields::PAY_DATE, "20240101071203")
            .with(fields::RESPONSE_CODE, response_code)
            .with(fields::TMN_CODE, TMN_CODE)
            .with(fields::TRANSACTION_NO, "14226112")
            .with(fields::TRANSACTION_STATUS, status)
            .with(fields::TXN_REF, txn_ref.as_str()),
    )
}

/// A successful callback for `txn_ref`.
pub fn success(txn_ref: &TxnRef, amount_minor: &str) -> ParamSet {
    callback(txn_ref, amount_minor, "00", "00")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
