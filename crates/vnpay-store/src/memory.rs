//! In-memory implementation of the InvoiceStore trait.
//!
//! Primarily for testing. It has the same semantics as SQLite but keeps
//! everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use vnpay_core::{GatewayFields, Invoice, InvoiceId, NewInvoice, PaymentStatus, TxnRef};

use crate::error::{Result, StoreError};
use crate::traits::{InvoiceStore, UpdateResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; every
/// conditional update runs under a single write guard.
pub struct MemoryInvoiceStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Invoices indexed by id, with their insertion order.
    invoices: HashMap<InvoiceId, (u64, Invoice)>,

    /// TxnRef index.
    by_txn_ref: HashMap<TxnRef, InvoiceId>,

    next_seq: u64,
}

impl MemoryInvoiceStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Number of stored invoices. Counts through a poisoned lock, since a
    /// panicked writer never leaves a half-inserted invoice behind.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .invoices
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryInvoiceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn create(&self, invoice: NewInvoice) -> Result<Invoice> {
        let mut inner = self.write()?;

        if inner.by_txn_ref.contains_key(&invoice.txn_ref) {
            return Err(StoreError::DuplicateTxnRef(invoice.txn_ref.into_inner()));
        }

        let invoice = invoice.into_invoice(InvoiceId::new_v4(), Utc::now());
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.by_txn_ref.insert(invoice.txn_ref.clone(), invoice.id);
        inner.invoices.insert(invoice.id, (seq, invoice.clone()));

        Ok(invoice)
    }

    async fn update_status_by_txn_ref(
        &self,
        txn_ref: &TxnRef,
        expected: Option<PaymentStatus>,
        status: PaymentStatus,
        fields: Option<&GatewayFields>,
    ) -> Result<UpdateResult> {
        let mut inner = self.write()?;

        let Some(id) = inner.by_txn_ref.get(txn_ref).copied() else {
            return Ok(UpdateResult::NotFound);
        };
        let Some((_, invoice)) = inner.invoices.get_mut(&id) else {
            return Err(StoreError::InvalidData(format!(
                "txn_ref {txn_ref} indexes missing invoice {id}"
            )));
        };

        if let Some(expected) = expected {
            if invoice.status != expected {
                return Ok(UpdateResult::StatusMismatch {
                    current: invoice.status,
                });
            }
        }

        invoice.apply(status, fields, Utc::now());
        Ok(UpdateResult::Updated(invoice.clone()))
    }

    async fn get_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>> {
        let inner = self.read()?;
        Ok(inner.invoices.get(id).map(|(_, invoice)| invoice.clone()))
    }

    async fn get_by_txn_ref(&self, txn_ref: &TxnRef) -> Result<Option<Invoice>> {
        let inner = self.read()?;
        Ok(inner
            .by_txn_ref
            .get(txn_ref)
            .and_then(|id| inner.invoices.get(id))
            .map(|(_, invoice)| invoice.clone()))
    }

    async fn list_by_customer(&self, customer_id: &str) -> Result<Vec<Invoice>> {
        let inner = self.read()?;

        let mut found: Vec<&(u64, Invoice)> = inner
            .invoices
            .values()
            .filter(|(_, invoice)| invoice.customer_id == customer_id)
            .collect();
        found.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });

        Ok(found.into_iter().map(|(_, invoice)| invoice.clone()).collect())
    }
}
