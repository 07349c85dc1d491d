//! InvoiceStore trait: the abstract interface for invoice persistence.
//!
//! The gateway is storage-agnostic. Implementations include SQLite (primary)
//! and in-memory (for tests).

use async_trait::async_trait;
use vnpay_core::{GatewayFields, Invoice, InvoiceId, NewInvoice, PaymentStatus, TxnRef};

use crate::error::Result;

/// Result of a conditional status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    /// The update was applied; carries the invoice as stored afterwards.
    Updated(Invoice),
    /// No invoice has this TxnRef.
    NotFound,
    /// The invoice exists but its status was not the expected one. Nothing
    /// was written.
    StatusMismatch {
        /// The status found in the store.
        current: PaymentStatus,
    },
}

/// The InvoiceStore trait: async interface for invoice persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, `spawn_blocking` is used internally to avoid blocking the
/// runtime.
///
/// # Design Notes
///
/// - **Atomic check-then-act**: [`InvoiceStore::update_status_by_txn_ref`]
///   compares the current status with `expected` and writes in one step.
/// - **Timestamps**: The store assigns `created_at` and `updated_at`.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a new invoice in `Pending` status.
    ///
    /// Assigns the id and timestamps. Fails with
    /// [`StoreError::DuplicateTxnRef`](crate::StoreError::DuplicateTxnRef) if
    /// the TxnRef is already bound to an invoice.
    async fn create(&self, invoice: NewInvoice) -> Result<Invoice>;

    /// Set the status of the invoice bound to `txn_ref`.
    ///
    /// # Arguments
    /// - `expected`: When `Some`, the update only applies if the current
    ///   status equals it.
    /// - `status`: The new status.
    /// - `fields`: Gateway fields to record. Absent fields keep their value.
    ///
    /// # Returns
    /// - `Updated` with the stored invoice if the write happened.
    /// - `NotFound` if no invoice has this TxnRef.
    /// - `StatusMismatch` if `expected` did not match.
    async fn update_status_by_txn_ref(
        &self,
        txn_ref: &TxnRef,
        expected: Option<PaymentStatus>,
        status: PaymentStatus,
        fields: Option<&GatewayFields>,
    ) -> Result<UpdateResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an invoice by id.
    async fn get_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>>;

    /// Get the invoice bound to a TxnRef.
    async fn get_by_txn_ref(&self, txn_ref: &TxnRef) -> Result<Option<Invoice>>;

    /// List a customer's invoices, newest first.
    async fn list_by_customer(&self, customer_id: &str) -> Result<Vec<Invoice>>;
}
