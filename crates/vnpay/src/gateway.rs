//! The Gateway: builds signed requests and reconciles callbacks against the
//! invoice store.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use vnpay_core::{
    canonical_string, fields, format_gateway_time, format_invoice_number, payment_notes,
    pipe_joined, sign, to_minor_units, Amounts, Invoice, InvoiceId, NewInvoice, ParamSet,
    PaymentMethod, PaymentStatus, TxnRef,
};
use vnpay_store::{InvoiceStore, StoreError, UpdateResult};

use crate::callback::{CallbackPayload, IpnAck, ReturnOutcome, ReturnResult};
use crate::clock::{Clock, SystemClock};
use crate::config::{ApiChecksum, GatewayConfig, RefundPolicy};
use crate::error::{GatewayError, Result};
use crate::ids::{IdGenerator, RandomIds};
use crate::reconcile::{check_ipn, status_from_ipn, status_from_return, IpnOutcome};
use crate::requests::{
    CreatedPayment, PayParams, PaymentRequest, QueryParams, QueryRequest, RefundParams,
    RefundRequest, SignedRequest, ToParamSet, QUERY_CHECKSUM_ORDER, QUERY_ORDER_INFO,
    REFUND_CHECKSUM_ORDER, REFUND_ORDER_INFO, UNKNOWN_TRANSACTION_NO,
};

/// Attempts at binding a fresh TxnRef before giving up.
const TXN_REF_ATTEMPTS: usize = 3;

/// A prepared refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRefund {
    pub request: SignedRequest,
    /// The invoice after preparation: `Refunded` under
    /// [`RefundPolicy::Immediate`], unchanged under [`RefundPolicy::Deferred`].
    pub invoice: Invoice,
}

/// The main Gateway struct.
///
/// Provides a unified API for:
/// - Creating payments (invoice first, then the signed redirect URL)
/// - Preparing signed query and refund requests
/// - Verifying and reconciling Return and IPN callbacks
/// - Reading invoices back
pub struct Gateway<S: InvoiceStore> {
    /// The storage backend.
    store: Arc<S>,
    /// Configuration.
    config: GatewayConfig,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl<S: InvoiceStore> Gateway<S> {
    /// Create a gateway with random ids and the system clock.
    pub fn new(store: S, config: GatewayConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
            ids: Arc::new(RandomIds::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the id generator.
    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outbound requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a Pending invoice and the signed payment URL for it.
    ///
    /// The invoice is stored before the URL is built, so the gateway never
    /// sees a TxnRef the store does not know.
    pub async fn create_payment(&self, request: PaymentRequest) -> Result<CreatedPayment> {
        if request.ip_addr.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("ip_addr is required".into()));
        }
        let amounts = Amounts::new(request.amount, request.discount, request.tax)?;
        let amount_minor = amounts.final_minor_units()?;

        let now = self.clock.now();
        let local_date = now.with_timezone(&self.offset()?).date_naive();
        let invoice_number = format_invoice_number(local_date, self.ids.invoice_serial());

        let invoice = self
            .create_invoice(&request, amounts, invoice_number, now)
            .await?;

        let expire = now.checked_add_signed(self.config.payment_ttl).ok_or_else(|| {
            GatewayError::InvalidRequest("payment expiry overflows the calendar".into())
        })?;

        let record = PayParams {
            version: self.config.version.clone(),
            tmn_code: self.config.tmn_code.clone(),
            amount_minor,
            bank_code: request.bank_code.clone(),
            create_date: self.gateway_time(now)?,
            currency: self.config.currency.clone(),
            expire_date: self.gateway_time(expire)?,
            ip_addr: request.ip_addr.clone(),
            locale: request
                .locale
                .clone()
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| self.config.default_locale.clone()),
            order_info: format!("Thanh toan cho don hang {}", invoice.invoice_number),
            order_type: self.config.order_type.clone(),
            return_url: self.config.return_url.clone(),
            txn_ref: invoice.txn_ref.clone(),
        };

        let params = record.to_param_set();
        let canonical = canonical_string(&params, self.config.space_encoding);
        let secure_hash = sign(&canonical, self.config.secret());
        tracing::debug!(txn_ref = %invoice.txn_ref, canonical = %canonical, "signed payment request");

        let payment_url = format!(
            "{}?{}&{}={}",
            self.config.payment_url,
            canonical,
            fields::SECURE_HASH,
            secure_hash
        );

        tracing::info!(
            invoice_id = %invoice.id,
            txn_ref = %invoice.txn_ref,
            amount_minor,
            "created payment"
        );

        Ok(CreatedPayment {
            payment_url,
            txn_ref: invoice.txn_ref,
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number,
            params,
            secure_hash,
        })
    }

    async fn create_invoice(
        &self,
        request: &PaymentRequest,
        amounts: Amounts,
        invoice_number: String,
        now: DateTime<Utc>,
    ) -> Result<Invoice> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let txn_ref = self.ids.txn_ref();
            let new_invoice = NewInvoice {
                invoice_number: invoice_number.clone(),
                invoice_type: request.invoice_type.clone(),
                customer_id: request.customer_id.clone(),
                ticket_id: request.ticket_id.clone(),
                amounts,
                method: PaymentMethod::VnPay,
                issue_date: now,
                notes: payment_notes(&txn_ref),
                txn_ref,
            };

            match self.bounded("create", self.store.create(new_invoice)).await {
                Err(GatewayError::Store(StoreError::DuplicateTxnRef(txn_ref)))
                    if attempt < TXN_REF_ATTEMPTS =>
                {
                    tracing::warn!(%txn_ref, attempt, "generated TxnRef already in use, retrying");
                }
                other => return other,
            }
        }
    }

    /// Prepare a signed `querydr` request. No side effects.
    pub async fn query_transaction(&self, request: QueryRequest) -> Result<SignedRequest> {
        let record = QueryParams {
            request_id: self.ids.request_id(),
            version: self.config.version.clone(),
            tmn_code: self.config.tmn_code.clone(),
            txn_ref: request.txn_ref,
            order_info: QUERY_ORDER_INFO.to_string(),
            transaction_date: request.transaction_date,
            create_date: self.gateway_time(self.clock.now())?,
            ip_addr: request.ip_addr,
        };
        Ok(self.sign_api_request(record.to_param_set(), &QUERY_CHECKSUM_ORDER))
    }

    /// Prepare a signed `refund` request.
    ///
    /// Under [`RefundPolicy::Immediate`] the invoice is moved to `Refunded`
    /// here, before the caller submits the request. Under
    /// [`RefundPolicy::Deferred`] it is left alone until
    /// [`Gateway::confirm_refund`].
    pub async fn refund(&self, request: RefundRequest) -> Result<PreparedRefund> {
        let invoice = self.require_by_txn_ref(&request.txn_ref).await?;
        ensure_transition(&invoice, PaymentStatus::Refunded)?;

        let amount = request.amount.unwrap_or(invoice.amounts.final_amount);
        if amount <= Decimal::ZERO || amount > invoice.amounts.final_amount {
            return Err(GatewayError::InvalidRequest(format!(
                "refund amount {amount} must be positive and at most {}",
                invoice.amounts.final_amount
            )));
        }

        let record = RefundParams {
            request_id: self.ids.request_id(),
            version: self.config.version.clone(),
            tmn_code: self.config.tmn_code.clone(),
            kind: request.kind,
            txn_ref: request.txn_ref.clone(),
            amount_minor: to_minor_units(amount)?,
            order_info: REFUND_ORDER_INFO.to_string(),
            transaction_no: request
                .transaction_no
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_TRANSACTION_NO.to_string()),
            transaction_date: request.transaction_date,
            create_by: request.create_by,
            create_date: self.gateway_time(self.clock.now())?,
            ip_addr: request.ip_addr,
        };
        let signed = self.sign_api_request(record.to_param_set(), &REFUND_CHECKSUM_ORDER);

        let invoice = match self.config.refund_policy {
            RefundPolicy::Immediate => self.mark_refunded(invoice).await?,
            RefundPolicy::Deferred => {
                tracing::info!(txn_ref = %invoice.txn_ref, "refund prepared, awaiting confirmation");
                invoice
            }
        };

        Ok(PreparedRefund {
            request: signed,
            invoice,
        })
    }

    /// Move an invoice to `Refunded` once the gateway has accepted the refund.
    pub async fn confirm_refund(&self, txn_ref: &TxnRef) -> Result<Invoice> {
        let invoice = self.require_by_txn_ref(txn_ref).await?;
        ensure_transition(&invoice, PaymentStatus::Refunded)?;
        self.mark_refunded(invoice).await
    }

    async fn mark_refunded(&self, invoice: Invoice) -> Result<Invoice> {
        let result = self
            .bounded(
                "update_status_by_txn_ref",
                self.store.update_status_by_txn_ref(
                    &invoice.txn_ref,
                    Some(invoice.status),
                    PaymentStatus::Refunded,
                    None,
                ),
            )
            .await?;

        match result {
            UpdateResult::Updated(updated) => {
                tracing::info!(
                    txn_ref = %updated.txn_ref,
                    from = %invoice.status,
                    "invoice refunded"
                );
                Ok(updated)
            }
            UpdateResult::NotFound => Err(GatewayError::InvoiceNotFound(invoice.txn_ref.into_inner())),
            UpdateResult::StatusMismatch { current } => Err(GatewayError::InvalidTransition {
                txn_ref: invoice.txn_ref.into_inner(),
                from: current,
                to: PaymentStatus::Refunded,
            }),
        }
    }

    fn sign_api_request(&self, mut params: ParamSet, pipe_order: &[&str]) -> SignedRequest {
        let secure_hash = match self.config.api_checksum {
            ApiChecksum::Canonical => sign(
                &canonical_string(&params, self.config.space_encoding),
                self.config.secret(),
            ),
            ApiChecksum::PipeDelimited => sign(&pipe_joined(&params, pipe_order), self.config.secret()),
        };
        params.insert(fields::SECURE_HASH, secure_hash);
        SignedRequest {
            endpoint: self.config.transaction_api_url.clone(),
            params,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound callbacks
    // ─────────────────────────────────────────────────────────────────────────

    /// Process the browser Return.
    ///
    /// A valid signature settles a `Pending` invoice on the response code
    /// alone. An invalid one changes nothing. The invoice id is resolved in
    /// every case where the invoice exists.
    pub async fn process_return(&self, params: ParamSet) -> Result<ReturnResult> {
        let payload = CallbackPayload::new(params);
        let txn_ref = payload.txn_ref();
        let is_valid = payload.verify(self.config.secret(), self.config.space_encoding);

        if !is_valid {
            tracing::warn!(%txn_ref, "return callback with invalid signature");
            let invoice_id = self.find_by_txn_ref(&txn_ref).await?.map(|i| i.id);
            return Ok(ReturnResult::from_payload(
                &payload,
                false,
                ReturnOutcome::InvalidSignature,
                invoice_id,
            ));
        }

        let status = status_from_return(payload.response_code());
        let fields = payload.gateway_fields();
        let result = self
            .bounded(
                "update_status_by_txn_ref",
                self.store.update_status_by_txn_ref(
                    &txn_ref,
                    Some(PaymentStatus::Pending),
                    status,
                    Some(&fields),
                ),
            )
            .await?;

        let (outcome, invoice_id) = match result {
            UpdateResult::Updated(invoice) => {
                tracing::info!(%txn_ref, %status, "return callback settled invoice");
                (ReturnOutcome::Applied(status), Some(invoice.id))
            }
            UpdateResult::StatusMismatch { current } => {
                tracing::debug!(%txn_ref, %current, "return callback for settled invoice");
                let invoice_id = self.find_by_txn_ref(&txn_ref).await?.map(|i| i.id);
                (ReturnOutcome::AlreadySettled(current), invoice_id)
            }
            UpdateResult::NotFound => {
                tracing::warn!(%txn_ref, "return callback for unknown TxnRef");
                (ReturnOutcome::InvoiceNotFound, None)
            }
        };

        Ok(ReturnResult::from_payload(&payload, true, outcome, invoice_id))
    }

    /// Process an IPN and decide its outcome.
    ///
    /// Checks, in order: signature, invoice exists, amount matches, invoice is
    /// `Pending`. Only then is the status written, conditionally on the
    /// invoice still being `Pending`.
    pub async fn process_ipn(&self, params: ParamSet) -> Result<IpnOutcome> {
        let payload = CallbackPayload::new(params);
        let txn_ref = payload.txn_ref();

        if !payload.verify(self.config.secret(), self.config.space_encoding) {
            tracing::warn!(%txn_ref, "IPN with invalid signature");
            return Ok(IpnOutcome::InvalidSignature);
        }

        let Some(invoice) = self.find_by_txn_ref(&txn_ref).await? else {
            tracing::warn!(%txn_ref, "IPN for unknown TxnRef");
            return Ok(IpnOutcome::OrderNotFound);
        };

        let expected = invoice.expected_minor_units()?;
        if let Some(outcome) = check_ipn(&invoice, expected, payload.amount_minor()) {
            match &outcome {
                IpnOutcome::InvalidAmount { expected, declared } => {
                    tracing::warn!(%txn_ref, expected, ?declared, "IPN amount mismatch");
                }
                other => tracing::debug!(%txn_ref, outcome = ?other, "IPN not applied"),
            }
            return Ok(outcome);
        }

        let status = status_from_ipn(payload.response_code(), payload.transaction_status());
        let fields = payload.gateway_fields();
        let result = self
            .bounded(
                "update_status_by_txn_ref",
                self.store.update_status_by_txn_ref(
                    &txn_ref,
                    Some(PaymentStatus::Pending),
                    status,
                    Some(&fields),
                ),
            )
            .await?;

        Ok(match result {
            UpdateResult::Updated(_) => {
                tracing::info!(%txn_ref, %status, "IPN settled invoice");
                IpnOutcome::Confirmed(status)
            }
            UpdateResult::StatusMismatch { current } => {
                tracing::warn!(%txn_ref, %current, "IPN lost race to a concurrent callback");
                IpnOutcome::AlreadyConfirmed(current)
            }
            UpdateResult::NotFound => IpnOutcome::OrderNotFound,
        })
    }

    /// Process an IPN and produce the acknowledgement body.
    ///
    /// Errors become `99 Unknown error` so the gateway retries.
    pub async fn ipn_ack(&self, params: ParamSet) -> IpnAck {
        match self.process_ipn(params).await {
            Ok(outcome) => outcome.ack(),
            Err(e) => {
                tracing::error!(error = %e, retryable = e.is_retryable(), "IPN processing failed");
                IpnAck::unknown_error()
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an invoice by id.
    pub async fn invoice(&self, id: &InvoiceId) -> Result<Invoice> {
        self.bounded("get_by_id", self.store.get_by_id(id))
            .await?
            .ok_or_else(|| GatewayError::InvoiceNotFound(id.to_string()))
    }

    /// Get the invoice bound to a TxnRef.
    pub async fn invoice_by_txn_ref(&self, txn_ref: &TxnRef) -> Result<Invoice> {
        self.require_by_txn_ref(txn_ref).await
    }

    /// List a customer's invoices, newest first.
    pub async fn invoices_for_customer(&self, customer_id: &str) -> Result<Vec<Invoice>> {
        self.bounded("list_by_customer", self.store.list_by_customer(customer_id))
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn find_by_txn_ref(&self, txn_ref: &TxnRef) -> Result<Option<Invoice>> {
        self.bounded("get_by_txn_ref", self.store.get_by_txn_ref(txn_ref))
            .await
    }

    async fn require_by_txn_ref(&self, txn_ref: &TxnRef) -> Result<Invoice> {
        self.find_by_txn_ref(txn_ref)
            .await?
            .ok_or_else(|| GatewayError::InvoiceNotFound(txn_ref.to_string()))
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = vnpay_store::Result<T>>,
    {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result.map_err(GatewayError::from),
            Err(_) => {
                tracing::error!(operation, timeout = ?self.config.store_timeout, "store call timed out");
                Err(GatewayError::StoreTimeout {
                    operation,
                    timeout: self.config.store_timeout,
                })
            }
        }
    }

    fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.config.utc_offset_secs).ok_or_else(|| {
            GatewayError::Config(format!(
                "invalid UTC offset: {} seconds",
                self.config.utc_offset_secs
            ))
        })
    }

    fn gateway_time(&self, instant: DateTime<Utc>) -> Result<String> {
        Ok(format_gateway_time(instant, self.config.utc_offset_secs)?)
    }
}

fn ensure_transition(invoice: &Invoice, to: PaymentStatus) -> Result<()> {
    if invoice.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(GatewayError::InvalidTransition {
            txn_ref: invoice.txn_ref.to_string(),
            from: invoice.status,
            to,
        })
    }
}
