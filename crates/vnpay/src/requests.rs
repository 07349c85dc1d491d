//! Outbound request records.
//!
//! Each gateway command has a closed record type. Its [`ToParamSet`] impl is
//! the only place field names are attached to values, so the signed set and
//! the transmitted set cannot drift apart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vnpay_core::{fields, InvoiceId, ParamSet, TxnRef};

/// `vnp_Command` values.
pub mod command {
    pub const PAY: &str = "pay";
    pub const QUERY: &str = "querydr";
    pub const REFUND: &str = "refund";
}

/// Order info sent with a transaction query.
pub const QUERY_ORDER_INFO: &str = "Query transaction";

/// Order info sent with a refund.
pub const REFUND_ORDER_INFO: &str = "Hoan Tien Giao Dich";

/// `vnp_TransactionNo` when the gateway's transaction number is unknown.
pub const UNKNOWN_TRANSACTION_NO: &str = "0";

/// Field order of the pipe-delimited checksum for `querydr`.
pub const QUERY_CHECKSUM_ORDER: [&str; 9] = [
    fields::REQUEST_ID,
    fields::VERSION,
    fields::COMMAND,
    fields::TMN_CODE,
    fields::TXN_REF,
    fields::TRANSACTION_DATE,
    fields::CREATE_DATE,
    fields::IP_ADDR,
    fields::ORDER_INFO,
];

/// Field order of the pipe-delimited checksum for `refund`.
pub const REFUND_CHECKSUM_ORDER: [&str; 13] = [
    fields::REQUEST_ID,
    fields::VERSION,
    fields::COMMAND,
    fields::TMN_CODE,
    fields::TRANSACTION_TYPE,
    fields::TXN_REF,
    fields::AMOUNT,
    fields::TRANSACTION_NO,
    fields::TRANSACTION_DATE,
    fields::CREATE_BY,
    fields::CREATE_DATE,
    fields::IP_ADDR,
    fields::ORDER_INFO,
];

/// Conversion of a request record into gateway parameters.
pub trait ToParamSet {
    fn to_param_set(&self) -> ParamSet;
}

// ─────────────────────────────────────────────────────────────────────────────
// Caller input
// ─────────────────────────────────────────────────────────────────────────────

/// A customer payment to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub customer_id: String,
    pub ticket_id: String,
    /// Gross amount before discount and tax.
    pub amount: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    /// Gateway UI language (`vn`, `en`). Falls back to the configured default.
    #[serde(default)]
    pub locale: Option<String>,
    /// Preselected bank or method; omitted from the request when `None`.
    #[serde(default)]
    pub bank_code: Option<String>,
    #[serde(default)]
    pub invoice_type: String,
    /// Customer's IP address.
    pub ip_addr: String,
}

impl PaymentRequest {
    pub fn new(
        customer_id: impl Into<String>,
        ticket_id: impl Into<String>,
        amount: Decimal,
        ip_addr: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            ticket_id: ticket_id.into(),
            amount,
            discount: Decimal::ZERO,
            tax: Decimal::ZERO,
            locale: None,
            bank_code: None,
            invoice_type: String::new(),
            ip_addr: ip_addr.into(),
        }
    }

    pub fn with_bank_code(mut self, bank_code: impl Into<String>) -> Self {
        self.bank_code = Some(bank_code.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_adjustments(mut self, discount: Decimal, tax: Decimal) -> Self {
        self.discount = discount;
        self.tax = tax;
        self
    }
}

/// A transaction status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub txn_ref: TxnRef,
    /// `vnp_CreateDate` of the original payment, `yyyyMMddHHmmss`.
    pub transaction_date: String,
    pub ip_addr: String,
}

/// Full or partial refund (`vnp_TransactionType`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundKind {
    #[default]
    Full,
    Partial,
}

impl RefundKind {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Full => "02",
            Self::Partial => "03",
        }
    }
}

/// A refund to prepare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    pub txn_ref: TxnRef,
    #[serde(default)]
    pub kind: RefundKind,
    /// Amount to refund. `None` refunds the invoice's final amount.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Gateway transaction number, if the merchant received one.
    #[serde(default)]
    pub transaction_no: Option<String>,
    /// `vnp_CreateDate` of the original payment, `yyyyMMddHHmmss`.
    pub transaction_date: String,
    /// Operator requesting the refund.
    pub create_by: String,
    pub ip_addr: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire records
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters of a `pay` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayParams {
    pub version: String,
    pub tmn_code: String,
    pub amount_minor: i64,
    pub bank_code: Option<String>,
    pub create_date: String,
    pub currency: String,
    pub expire_date: String,
    pub ip_addr: String,
    pub locale: String,
    pub order_info: String,
    pub order_type: String,
    pub return_url: String,
    pub txn_ref: TxnRef,
}

impl ToParamSet for PayParams {
    fn to_param_set(&self) -> ParamSet {
        let mut params = ParamSet::new()
            .with(fields::VERSION, self.version.as_str())
            .with(fields::COMMAND, command::PAY)
            .with(fields::TMN_CODE, self.tmn_code.as_str())
            .with(fields::AMOUNT, self.amount_minor.to_string())
            .with(fields::CREATE_DATE, self.create_date.as_str())
            .with(fields::CURR_CODE, self.currency.as_str())
            .with(fields::EXPIRE_DATE, self.expire_date.as_str())
            .with(fields::IP_ADDR, self.ip_addr.as_str())
            .with(fields::LOCALE, self.locale.as_str())
            .with(fields::ORDER_INFO, self.order_info.as_str())
            .with(fields::ORDER_TYPE, self.order_type.as_str())
            .with(fields::RETURN_URL, self.return_url.as_str())
            .with(fields::TXN_REF, self.txn_ref.as_str());
        params.insert_opt(
            fields::BANK_CODE,
            self.bank_code.as_deref().filter(|code| !code.is_empty()),
        );
        params
    }
}

/// Parameters of a `querydr` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub request_id: String,
    pub version: String,
    pub tmn_code: String,
    pub txn_ref: TxnRef,
    pub order_info: String,
    pub transaction_date: String,
    pub create_date: String,
    pub ip_addr: String,
}

impl ToParamSet for QueryParams {
    fn to_param_set(&self) -> ParamSet {
        ParamSet::new()
            .with(fields::REQUEST_ID, self.request_id.as_str())
            .with(fields::VERSION, self.version.as_str())
            .with(fields::COMMAND, command::QUERY)
            .with(fields::TMN_CODE, self.tmn_code.as_str())
            .with(fields::TXN_REF, self.txn_ref.as_str())
            .with(fields::ORDER_INFO, self.order_info.as_str())
            .with(fields::TRANSACTION_DATE, self.transaction_date.as_str())
            .with(fields::CREATE_DATE, self.create_date.as_str())
            .with(fields::IP_ADDR, self.ip_addr.as_str())
    }
}

/// Parameters of a `refund` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundParams {
    pub request_id: String,
    pub version: String,
    pub tmn_code: String,
    pub kind: RefundKind,
    pub txn_ref: TxnRef,
    pub amount_minor: i64,
    pub order_info: String,
    pub transaction_no: String,
    pub transaction_date: String,
    pub create_by: String,
    pub create_date: String,
    pub ip_addr: String,
}

impl ToParamSet for RefundParams {
    fn to_param_set(&self) -> ParamSet {
        ParamSet::new()
            .with(fields::REQUEST_ID, self.request_id.as_str())
            .with(fields::VERSION, self.version.as_str())
            .with(fields::COMMAND, command::REFUND)
            .with(fields::TMN_CODE, self.tmn_code.as_str())
            .with(fields::TRANSACTION_TYPE, self.kind.code())
            .with(fields::TXN_REF, self.txn_ref.as_str())
            .with(fields::AMOUNT, self.amount_minor.to_string())
            .with(fields::ORDER_INFO, self.order_info.as_str())
            .with(fields::TRANSACTION_NO, self.transaction_no.as_str())
            .with(fields::TRANSACTION_DATE, self.transaction_date.as_str())
            .with(fields::CREATE_BY, self.create_by.as_str())
            .with(fields::CREATE_DATE, self.create_date.as_str())
            .with(fields::IP_ADDR, self.ip_addr.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// A payment ready for redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedPayment {
    /// `<payment_url>?<canonical>&vnp_SecureHash=<hex>`.
    pub payment_url: String,
    pub txn_ref: TxnRef,
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    /// The signed parameters, without the hash.
    #[serde(skip)]
    pub params: ParamSet,
    pub secure_hash: String,
}

/// A signed parameter set for the caller to POST to the merchant web API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedRequest {
    pub endpoint: String,
    /// All parameters including `vnp_SecureHash`.
    pub params: ParamSet,
}

impl SignedRequest {
    /// The JSON body the merchant web API accepts.
    pub fn body(&self) -> serde_json::Value {
        serde_json::to_value(&self.params).unwrap_or(serde_json::Value::Null)
    }

    pub fn secure_hash(&self) -> &str {
        self.params.get_or_empty(fields::SECURE_HASH)
    }
}
