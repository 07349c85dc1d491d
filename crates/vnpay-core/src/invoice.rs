//! The invoice a gateway payment is reconciled against.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amount::Amounts;
use crate::error::{CoreError, Result};
use crate::status::{PaymentMethod, PaymentStatus};

/// Unique identifier of an invoice.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub Uuid);

impl InvoiceId {
    /// Generate a fresh random id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InvoiceId({})", self.0)
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for InvoiceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CoreError::InvalidInvoiceId(s.to_string()))
    }
}

impl From<Uuid> for InvoiceId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Merchant transaction reference correlating one payment attempt to one
/// invoice. Opaque; only equality matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnRef(String);

impl TxnRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TxnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TxnRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TxnRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for TxnRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reconciliation fields reported by the gateway, stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayFields {
    pub bank_code: Option<String>,
    pub transaction_no: Option<String>,
    /// `vnp_PayDate` as sent (`yyyyMMddHHmmss`, gateway local time).
    pub pay_date: Option<String>,
}

impl GatewayFields {
    pub fn is_empty(&self) -> bool {
        self.bank_code.is_none() && self.transaction_no.is_none() && self.pay_date.is_none()
    }
}

/// Everything needed to create an invoice. The store assigns the id and
/// timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub invoice_type: String,
    pub customer_id: String,
    pub ticket_id: String,
    pub amounts: Amounts,
    pub method: PaymentMethod,
    pub issue_date: DateTime<Utc>,
    pub notes: String,
    pub txn_ref: TxnRef,
}

impl NewInvoice {
    /// Materialize as a stored invoice. Always starts `Pending`.
    pub fn into_invoice(self, id: InvoiceId, now: DateTime<Utc>) -> Invoice {
        Invoice {
            id,
            invoice_number: self.invoice_number,
            invoice_type: self.invoice_type,
            customer_id: self.customer_id,
            ticket_id: self.ticket_id,
            amounts: self.amounts,
            status: PaymentStatus::Pending,
            method: self.method,
            issue_date: self.issue_date,
            notes: self.notes,
            txn_ref: self.txn_ref,
            gateway: GatewayFields::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stored invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub invoice_type: String,
    pub customer_id: String,
    pub ticket_id: String,
    pub amounts: Amounts,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub issue_date: DateTime<Utc>,
    pub notes: String,
    pub txn_ref: TxnRef,
    pub gateway: GatewayFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// The amount the gateway must report, in minor units.
    pub fn expected_minor_units(&self) -> Result<i64> {
        self.amounts.final_minor_units()
    }

    /// Apply a status change and gateway fields. Fields the gateway did not
    /// report keep their previous value.
    pub fn apply(&mut self, status: PaymentStatus, fields: Option<&GatewayFields>, now: DateTime<Utc>) {
        self.status = status;
        if let Some(fields) = fields {
            if fields.bank_code.is_some() {
                self.gateway.bank_code = fields.bank_code.clone();
            }
            if fields.transaction_no.is_some() {
                self.gateway.transaction_no = fields.transaction_no.clone();
            }
            if fields.pay_date.is_some() {
                self.gateway.pay_date = fields.pay_date.clone();
            }
        }
        self.updated_at = now;
    }
}

/// Format an invoice number: `INV-<yyyyMMdd>-<6 digits>`.
///
/// Only the low six decimal digits of `serial` are used.
pub fn format_invoice_number(date: NaiveDate, serial: u32) -> String {
    format!("INV-{}-{:06}", date.format("%Y%m%d"), serial % 1_000_000)
}

/// Notes recorded on an invoice created for a gateway payment.
pub fn payment_notes(txn_ref: &TxnRef) -> String {
    format!("Payment via VNPay, TxnRef: {txn_ref}")
}
