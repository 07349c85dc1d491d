//! Reconciliation rules: how a verified callback maps onto an invoice.
//!
//! Everything here is pure. The [`Gateway`](crate::Gateway) reads the invoice,
//! asks these functions what to do, and applies the answer with a conditional
//! store update so a concurrent callback cannot slip in between.

use serde::Serialize;
use vnpay_core::{Invoice, PaymentStatus, RESPONSE_SUCCESS};

use crate::callback::IpnAck;

/// Outcome of an IPN, one-to-one with the acknowledgement codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IpnOutcome {
    /// The invoice moved from `Pending` to this status. `00`.
    Confirmed(PaymentStatus),
    /// No invoice has this TxnRef. `01`.
    OrderNotFound,
    /// The invoice was already settled (replay or lost race). `02`.
    AlreadyConfirmed(PaymentStatus),
    /// Declared amount differs from the invoice's final amount. `04`.
    InvalidAmount {
        expected: i64,
        declared: Option<i64>,
    },
    /// Signature check failed. `97`.
    InvalidSignature,
}

impl IpnOutcome {
    /// The acknowledgement to send back to the gateway.
    pub fn ack(&self) -> IpnAck {
        match self {
            Self::Confirmed(_) => IpnAck::confirm_success(),
            Self::OrderNotFound => IpnAck::order_not_found(),
            Self::AlreadyConfirmed(_) => IpnAck::already_confirmed(),
            Self::InvalidAmount { .. } => IpnAck::invalid_amount(),
            Self::InvalidSignature => IpnAck::invalid_signature(),
        }
    }

    /// Whether the invoice was written.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// Status a Return callback settles on: only the response code counts.
pub fn status_from_return(response_code: &str) -> PaymentStatus {
    if response_code == RESPONSE_SUCCESS {
        PaymentStatus::Completed
    } else {
        PaymentStatus::Failed
    }
}

/// Status an IPN settles on: response code and transaction status must both
/// report success.
pub fn status_from_ipn(response_code: &str, transaction_status: &str) -> PaymentStatus {
    if response_code == RESPONSE_SUCCESS && transaction_status == RESPONSE_SUCCESS {
        PaymentStatus::Completed
    } else {
        PaymentStatus::Failed
    }
}

/// IPN checklist steps 2 and 3 against a found invoice: the declared amount
/// must equal the final amount in minor units, then the invoice must still
/// be `Pending`.
///
/// Returns `None` when the IPN may be applied.
pub fn check_ipn(invoice: &Invoice, expected_minor: i64, declared_minor: Option<i64>) -> Option<IpnOutcome> {
    if declared_minor != Some(expected_minor) {
        return Some(IpnOutcome::InvalidAmount {
            expected: expected_minor,
            declared: declared_minor,
        });
    }
    if invoice.status != PaymentStatus::Pending {
        return Some(IpnOutcome::AlreadyConfirmed(invoice.status));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use vnpay_core::{Amounts, InvoiceId, NewInvoice, PaymentMethod, TxnRef};

    fn invoice(status: PaymentStatus) -> Invoice {
        let mut invoice = NewInvoice {
            invoice_number: "INV-20240101-000001".into(),
            invoice_type: String::new(),
            customer_id: "c1".into(),
            ticket_id: "t1".into(),
            amounts: Amounts::new(Decimal::from(100_000), Decimal::ZERO, Decimal::ZERO).unwrap(),
            method: PaymentMethod::VnPay,
            issue_date: Utc::now(),
            notes: String::new(),
            txn_ref: TxnRef::new("1000001"),
        }
        .into_invoice(InvoiceId::new_v4(), Utc::now());
        invoice.status = status;
        invoice
    }

    #[test]
    fn test_return_status() {
        assert_eq!(status_from_return("00"), PaymentStatus::Completed);
        assert_eq!(status_from_return("24"), PaymentStatus::Failed);
        assert_eq!(status_from_return(""), PaymentStatus::Failed);
    }

    #[test]
    fn test_ipn_status_needs_both_codes() {
        assert_eq!(status_from_ipn("00", "00"), PaymentStatus::Completed);
        assert_eq!(status_from_ipn("00", "02"), PaymentStatus::Failed);
        assert_eq!(status_from_ipn("24", "00"), PaymentStatus::Failed);
    }

    #[test]
    fn test_check_order_amount_before_status() {
        // A settled invoice with a wrong amount reports the amount first.
        let settled = invoice(PaymentStatus::Completed);
        assert_eq!(
            check_ipn(&settled, 10_000_000, Some(1)),
            Some(IpnOutcome::InvalidAmount {
                expected: 10_000_000,
                declared: Some(1)
            })
        );
        assert_eq!(
            check_ipn(&settled, 10_000_000, Some(10_000_000)),
            Some(IpnOutcome::AlreadyConfirmed(PaymentStatus::Completed))
        );
    }

    #[test]
    fn test_check_passes_for_pending() {
        let pending = invoice(PaymentStatus::Pending);
        assert_eq!(check_ipn(&pending, 10_000_000, Some(10_000_000)), None);
        assert!(matches!(
            check_ipn(&pending, 10_000_000, None),
            Some(IpnOutcome::InvalidAmount { declared: None, .. })
        ));
    }

    #[test]
    fn test_ack_codes() {
        let cases = [
            (IpnOutcome::Confirmed(PaymentStatus::Completed), "00"),
            (IpnOutcome::Confirmed(PaymentStatus::Failed), "00"),
            (IpnOutcome::OrderNotFound, "01"),
            (IpnOutcome::AlreadyConfirmed(PaymentStatus::Completed), "02"),
            (IpnOutcome::InvalidAmount { expected: 1, declared: None }, "04"),
            (IpnOutcome::InvalidSignature, "97"),
        ];
        for (outcome, code) in cases {
            assert_eq!(outcome.ack().rsp_code, code, "{outcome:?}");
        }
    }
}
