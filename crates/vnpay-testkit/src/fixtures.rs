//! Test fixtures and helpers.
//!
//! A gateway with a fixed clock and sequential ids, and a stand-in for the
//! payment gateway's side of the protocol: signed Return and IPN parameters.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use tracing_subscriber::filter::LevelFilter;
use vnpay::{CreatedPayment, FixedClock, Gateway, GatewayConfig, PaymentRequest, SequentialIds};
use vnpay_core::{fields, sign_params, to_minor_units, ParamSet, TxnRef};
use vnpay_store::{InvoiceStore, MemoryInvoiceStore};

/// Merchant terminal code used by fixtures.
pub const TEST_TMN_CODE: &str = "TEST01";

/// Shared secret used by fixtures.
pub const TEST_SECRET: &str = "SECRET";

/// A gateway wired for deterministic tests.
pub struct TestFixture<S: InvoiceStore = MemoryInvoiceStore> {
    pub gateway: Gateway<S>,
    pub clock: Arc<FixedClock>,
    secret: String,
}

impl TestFixture<MemoryInvoiceStore> {
    /// In-memory store and the test credentials.
    pub fn new() -> Self {
        Self::with_store(MemoryInvoiceStore::new(), Self::config())
    }
}

impl<S: InvoiceStore> TestFixture<S> {
    /// The test credentials on sandbox defaults.
    pub fn config() -> GatewayConfig {
        GatewayConfig::new(TEST_TMN_CODE, TEST_SECRET)
            .with_return_url("https://shop.example.vn/vnpay/return")
    }

    pub fn with_store(store: S, config: GatewayConfig) -> Self {
        let clock = Arc::new(FixedClock::new(Self::start()));
        let secret = config.hash_secret.expose_secret().clone();
        let gateway = Gateway::new(store, config)
            .with_ids(SequentialIds::default())
            .with_clock(clock.clone());
        Self {
            gateway,
            clock,
            secret,
        }
    }

    /// The instant the fixture clock starts at: 2024-01-01 07:00 gateway time.
    pub fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Create a payment for `amount` VND for a fixed customer.
    ///
    /// # Panics
    /// If the gateway rejects the request.
    pub async fn create_payment(&self, amount: i64) -> CreatedPayment {
        let request = PaymentRequest::new("cust-1", "ticket-1", Decimal::from(amount), "127.0.0.1");
        match self.gateway.create_payment(request).await {
            Ok(created) => created,
            Err(e) => panic!("fixture payment of {amount} failed: {e}"),
        }
    }

    /// Attach `vnp_SecureHash` and `vnp_SecureHashType` as the gateway would.
    pub fn sign(&self, mut params: ParamSet) -> ParamSet {
        let hash = sign_params(
            &params,
            self.secret.as_bytes(),
            self.gateway.config().space_encoding,
        );
        params.insert(fields::SECURE_HASH, hash);
        params.insert(fields::SECURE_HASH_TYPE, "HmacSHA512");
        params
    }

    /// A signed callback for `txn_ref` declaring `amount` VND.
    pub fn callback(
        &self,
        txn_ref: &TxnRef,
        amount: i64,
        response_code: &str,
        transaction_status: &str,
    ) -> ParamSet {
        let minor = to_minor_units(Decimal::from(amount))
            .map(|m| m.to_string())
            .unwrap_or_default();
        self.sign(
            ParamSet::new()
                .with(fields::AMOUNT, minor)
                .with(fields::BANK_CODE, "NCB")
                .with(fields::CARD_TYPE, "ATM")
                .with(fields::ORDER_INFO, "Thanh toan cho don hang")
                .with(fields::PAY_DATE, "20240101071203")
                .with(fields::RESPONSE_CODE, response_code)
                .with(fields::TMN_CODE, TEST_TMN_CODE)
                .with(fields::TRANSACTION_NO, "14226112")
                .with(fields::TRANSACTION_STATUS, transaction_status)
                .with(fields::TXN_REF, txn_ref.as_str()),
        )
    }

    /// A signed successful callback.
    pub fn success(&self, txn_ref: &TxnRef, amount: i64) -> ParamSet {
        self.callback(txn_ref, amount, "00", "00")
    }

    /// A signed callback where the customer cancelled.
    pub fn cancelled(&self, txn_ref: &TxnRef, amount: i64) -> ParamSet {
        self.callback(txn_ref, amount, "24", "02")
    }

    /// A successful callback whose amount was changed after signing.
    pub fn tampered(&self, txn_ref: &TxnRef, amount: i64) -> ParamSet {
        let mut params = self.success(txn_ref, amount);
        params.insert(fields::AMOUNT, "100");
        params
    }
}

impl Default for TestFixture<MemoryInvoiceStore> {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a test-writer subscriber once. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(LevelFilter::DEBUG)
        .try_init();
}
