//! Inbound callbacks: the browser Return and the server-to-server IPN.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vnpay_core::{
    fields, from_minor_units, parse_minor_units, parse_query, verify_params, GatewayFields,
    InvoiceId, ParamSet, PaymentStatus, SpaceEncoding, TxnRef,
};

/// A decoded callback parameter set, including its own secure hash.
///
/// Lives only for the duration of one verification and reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    params: ParamSet,
}

impl CallbackPayload {
    pub fn new(params: ParamSet) -> Self {
        Self { params }
    }

    /// Decode a raw query string (without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        Self::new(parse_query(query.trim_start_matches('?')))
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    /// Check `vnp_SecureHash` over the `vnp_` parameters.
    pub fn verify(&self, secret: &[u8], spaces: SpaceEncoding) -> bool {
        verify_params(&self.params, secret, spaces)
    }

    fn field(&self, name: &str) -> &str {
        self.params.get_or_empty(name)
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.params
            .get(name)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// The TxnRef, empty when absent.
    pub fn txn_ref(&self) -> TxnRef {
        TxnRef::new(self.field(fields::TXN_REF))
    }

    pub fn response_code(&self) -> &str {
        self.field(fields::RESPONSE_CODE)
    }

    pub fn transaction_status(&self) -> &str {
        self.field(fields::TRANSACTION_STATUS)
    }

    pub fn transaction_no(&self) -> &str {
        self.field(fields::TRANSACTION_NO)
    }

    pub fn bank_code(&self) -> &str {
        self.field(fields::BANK_CODE)
    }

    pub fn pay_date(&self) -> &str {
        self.field(fields::PAY_DATE)
    }

    pub fn order_info(&self) -> &str {
        self.field(fields::ORDER_INFO)
    }

    /// Declared amount in minor units, if present and numeric.
    pub fn amount_minor(&self) -> Option<i64> {
        parse_minor_units(self.field(fields::AMOUNT)).ok()
    }

    /// Reconciliation fields to persist with the status.
    pub fn gateway_fields(&self) -> GatewayFields {
        GatewayFields {
            bank_code: self.optional(fields::BANK_CODE),
            transaction_no: self.optional(fields::TRANSACTION_NO),
            pay_date: self.optional(fields::PAY_DATE),
        }
    }
}

impl From<ParamSet> for CallbackPayload {
    fn from(params: ParamSet) -> Self {
        Self::new(params)
    }
}

/// What a Return callback did to the invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReturnOutcome {
    /// The invoice moved out of `Pending` to this status.
    Applied(PaymentStatus),
    /// Another callback settled the invoice first; nothing changed.
    AlreadySettled(PaymentStatus),
    /// No invoice has this TxnRef.
    InvoiceNotFound,
    /// Signature check failed; nothing changed.
    InvalidSignature,
}

/// Result of processing a Return callback, for the caller to render or
/// redirect on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnResult {
    pub is_valid: bool,
    pub transaction_no: String,
    /// Declared amount in major units (zero when missing or malformed).
    pub amount: Decimal,
    pub order_info: String,
    pub response_code: String,
    /// Description of `response_code`.
    pub response_message: String,
    pub bank_code: String,
    pub pay_date: String,
    pub txn_ref: TxnRef,
    /// `Payment successful`, `Payment failed` or `Invalid signature`.
    pub result: String,
    /// The invoice for the TxnRef, resolved whatever the signature outcome.
    pub invoice_id: Option<InvoiceId>,
    pub outcome: ReturnOutcome,
}

impl ReturnResult {
    pub(crate) fn from_payload(
        payload: &CallbackPayload,
        is_valid: bool,
        outcome: ReturnOutcome,
        invoice_id: Option<InvoiceId>,
    ) -> Self {
        let result = if !is_valid {
            "Invalid signature"
        } else if payload.response_code() == vnpay_core::RESPONSE_SUCCESS {
            "Payment successful"
        } else {
            "Payment failed"
        };

        Self {
            is_valid,
            transaction_no: payload.transaction_no().to_string(),
            amount: payload
                .amount_minor()
                .map(from_minor_units)
                .unwrap_or(Decimal::ZERO),
            order_info: payload.order_info().to_string(),
            response_code: payload.response_code().to_string(),
            response_message: vnpay_core::describe_response_code(payload.response_code())
                .to_string(),
            bank_code: payload.bank_code().to_string(),
            pay_date: payload.pay_date().to_string(),
            txn_ref: payload.txn_ref(),
            result: result.to_string(),
            invoice_id,
            outcome,
        }
    }
}

/// The two-field acknowledgement body the gateway expects from an IPN
/// endpoint. Field names and messages are part of the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpnAck {
    #[serde(rename = "RspCode")]
    pub rsp_code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl IpnAck {
    fn new(rsp_code: &str, message: &str) -> Self {
        Self {
            rsp_code: rsp_code.to_string(),
            message: message.to_string(),
        }
    }

    pub fn confirm_success() -> Self {
        Self::new("00", "Confirm Success")
    }

    pub fn order_not_found() -> Self {
        Self::new("01", "Order not found")
    }

    pub fn already_confirmed() -> Self {
        Self::new("02", "Order already confirmed")
    }

    pub fn invalid_amount() -> Self {
        Self::new("04", "Invalid amount")
    }

    pub fn invalid_signature() -> Self {
        Self::new("97", "Invalid signature")
    }

    pub fn unknown_error() -> Self {
        Self::new("99", "Unknown error")
    }

    /// Serialize as the response body.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
