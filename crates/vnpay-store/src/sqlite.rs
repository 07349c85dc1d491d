//! SQLite implementation of the InvoiceStore trait.
//!
//! The primary storage backend. Uses rusqlite with bundled SQLite, wrapped in
//! async via tokio::spawn_blocking.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use uuid::Uuid;

use vnpay_core::{
    Amounts, GatewayFields, Invoice, InvoiceId, NewInvoice, PaymentMethod, PaymentStatus, TxnRef,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InvoiceStore, UpdateResult};

/// Columns in the order [`row_to_invoice`] reads them.
const INVOICE_COLUMNS: &str = "invoice_id, invoice_number, invoice_type, customer_id, ticket_id,
     total_amount, discount_amount, tax_amount, final_amount, payment_status, payment_method,
     issue_date, notes, txn_ref, bank_code, transaction_no, pay_date, created_at, updated_at";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking to avoid
/// blocking the async runtime.
pub struct SqliteInvoiceStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteInvoiceStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {e}")))?
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn decimal_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn time_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let micros: i64 = row.get(idx)?;
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        conversion_error(
            idx,
            StoreError::InvalidData(format!("timestamp out of range: {micros}")),
        )
    })
}

// Helper to convert a row to Invoice
fn row_to_invoice(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invoice> {
    let id: String = row.get(0)?;
    let status: String = row.get(9)?;
    let method: String = row.get(10)?;

    Ok(Invoice {
        id: InvoiceId(Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?),
        invoice_number: row.get(1)?,
        invoice_type: row.get(2)?,
        customer_id: row.get(3)?,
        ticket_id: row.get(4)?,
        amounts: Amounts {
            total: decimal_at(row, 5)?,
            discount: decimal_at(row, 6)?,
            tax: decimal_at(row, 7)?,
            final_amount: decimal_at(row, 8)?,
        },
        status: PaymentStatus::from_str(&status).map_err(|e| conversion_error(9, e))?,
        method: PaymentMethod::from_str(&method).map_err(|e| conversion_error(10, e))?,
        issue_date: time_at(row, 11)?,
        notes: row.get(12)?,
        txn_ref: TxnRef::new(row.get::<_, String>(13)?),
        gateway: GatewayFields {
            bank_code: row.get(14)?,
            transaction_no: row.get(15)?,
            pay_date: row.get(16)?,
        },
        created_at: time_at(row, 17)?,
        updated_at: time_at(row, 18)?,
    })
}

fn select_by_txn_ref(conn: &Connection, txn_ref: &str) -> Result<Option<Invoice>> {
    conn.query_row(
        &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE txn_ref = ?1"),
        params![txn_ref],
        row_to_invoice,
    )
    .optional()
    .map_err(StoreError::from)
}

#[async_trait]
impl InvoiceStore for SqliteInvoiceStore {
    async fn create(&self, invoice: NewInvoice) -> Result<Invoice> {
        self.run(move |conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT invoice_id FROM invoices WHERE txn_ref = ?1",
                    params![invoice.txn_ref.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::DuplicateTxnRef(invoice.txn_ref.into_inner()));
            }

            // Timestamps are stored with microsecond precision.
            let mut invoice = invoice.into_invoice(InvoiceId::new_v4(), Utc::now().trunc_subsecs(6));
            invoice.issue_date = invoice.issue_date.trunc_subsecs(6);
            conn.execute(
                "INSERT INTO invoices (
                    invoice_id, invoice_number, invoice_type, customer_id, ticket_id,
                    total_amount, discount_amount, tax_amount, final_amount,
                    payment_status, payment_method, issue_date, notes, txn_ref,
                    bank_code, transaction_no, pay_date, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                params![
                    invoice.id.to_string(),
                    invoice.invoice_number,
                    invoice.invoice_type,
                    invoice.customer_id,
                    invoice.ticket_id,
                    invoice.amounts.total.to_string(),
                    invoice.amounts.discount.to_string(),
                    invoice.amounts.tax.to_string(),
                    invoice.amounts.final_amount.to_string(),
                    invoice.status.as_str(),
                    invoice.method.as_str(),
                    invoice.issue_date.timestamp_micros(),
                    invoice.notes,
                    invoice.txn_ref.as_str(),
                    invoice.gateway.bank_code,
                    invoice.gateway.transaction_no,
                    invoice.gateway.pay_date,
                    invoice.created_at.timestamp_micros(),
                    invoice.updated_at.timestamp_micros(),
                ],
            )?;

            Ok(invoice)
        })
        .await
    }

    async fn update_status_by_txn_ref(
        &self,
        txn_ref: &TxnRef,
        expected: Option<PaymentStatus>,
        status: PaymentStatus,
        fields: Option<&GatewayFields>,
    ) -> Result<UpdateResult> {
        let txn_ref = txn_ref.clone();
        let fields = fields.cloned().unwrap_or_default();

        self.run(move |conn| {
            let tx = conn.transaction()?;

            // Check and write in one statement.
            let changed = tx.execute(
                "UPDATE invoices SET
                    payment_status = ?1,
                    bank_code = COALESCE(?2, bank_code),
                    transaction_no = COALESCE(?3, transaction_no),
                    pay_date = COALESCE(?4, pay_date),
                    updated_at = ?5
                 WHERE txn_ref = ?6 AND (?7 IS NULL OR payment_status = ?7)",
                params![
                    status.as_str(),
                    fields.bank_code,
                    fields.transaction_no,
                    fields.pay_date,
                    Utc::now().timestamp_micros(),
                    txn_ref.as_str(),
                    expected.map(|s| s.as_str()),
                ],
            )?;

            let stored = select_by_txn_ref(&tx, txn_ref.as_str())?;
            tx.commit()?;

            Ok(match (changed, stored) {
                (_, None) => UpdateResult::NotFound,
                (0, Some(invoice)) => UpdateResult::StatusMismatch {
                    current: invoice.status,
                },
                (_, Some(invoice)) => UpdateResult::Updated(invoice),
            })
        })
        .await
    }

    async fn get_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>> {
        let id = *id;
        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = ?1"),
                params![id.to_string()],
                row_to_invoice,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_by_txn_ref(&self, txn_ref: &TxnRef) -> Result<Option<Invoice>> {
        let txn_ref = txn_ref.clone();
        self.run(move |conn| select_by_txn_ref(conn, txn_ref.as_str()))
            .await
    }

    async fn list_by_customer(&self, customer_id: &str) -> Result<Vec<Invoice>> {
        let customer_id = customer_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INVOICE_COLUMNS} FROM invoices
                 WHERE customer_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let invoices = stmt
                .query_map(params![customer_id], row_to_invoice)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(invoices)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_invoice(txn_ref: &str, customer: &str) -> NewInvoice {
        NewInvoice {
            invoice_number: format!("INV-20240101-{txn_ref}"),
            invoice_type: "TICKET".into(),
            customer_id: customer.into(),
            ticket_id: "ticket-1".into(),
            amounts: Amounts::new(
                Decimal::from_str("100000.50").unwrap(),
                Decimal::from(500),
                Decimal::from(1000),
            )
            .unwrap(),
            method: PaymentMethod::VnPay,
            issue_date: DateTime::from_timestamp_micros(1_704_067_200_000_000).unwrap(),
            notes: "Payment via VNPay, TxnRef: 1".into(),
            txn_ref: TxnRef::new(txn_ref),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SqliteInvoiceStore::open_memory().unwrap();
        let created = store.create(new_invoice("1000001", "c1")).await.unwrap();
        assert_eq!(created.status, PaymentStatus::Pending);

        let by_id = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);
        assert_eq!(by_id.amounts.final_amount, Decimal::from_str("100500.50").unwrap());

        let by_ref = store
            .get_by_txn_ref(&TxnRef::new("1000001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_ref.id, created.id);
        assert!(store.get_by_id(&InvoiceId::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_txn_ref() {
        let store = SqliteInvoiceStore::open_memory().unwrap();
        store.create(new_invoice("1000001", "c1")).await.unwrap();
        let err = store.create(new_invoice("1000001", "c1")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTxnRef(_)));
    }

    #[tokio::test]
    async fn test_conditional_update() {
        let store = SqliteInvoiceStore::open_memory().unwrap();
        store.create(new_invoice("1000001", "c1")).await.unwrap();
        let txn_ref = TxnRef::new("1000001");
        let fields = GatewayFields {
            bank_code: Some("NCB".into()),
            transaction_no: Some("14000001".into()),
            pay_date: Some("20240101120000".into()),
        };

        let first = store
            .update_status_by_txn_ref(
                &txn_ref,
                Some(PaymentStatus::Pending),
                PaymentStatus::Failed,
                Some(&fields),
            )
            .await
            .unwrap();
        let UpdateResult::Updated(invoice) = first else {
            panic!("expected update, got {first:?}");
        };
        assert_eq!(invoice.status, PaymentStatus::Failed);
        assert_eq!(invoice.gateway, fields);

        let replay = store
            .update_status_by_txn_ref(
                &txn_ref,
                Some(PaymentStatus::Pending),
                PaymentStatus::Completed,
                None,
            )
            .await
            .unwrap();
        assert_eq!(
            replay,
            UpdateResult::StatusMismatch {
                current: PaymentStatus::Failed
            }
        );

        // Unconditional update keeps previously recorded gateway fields.
        let refunded = store
            .update_status_by_txn_ref(&txn_ref, None, PaymentStatus::Refunded, None)
            .await
            .unwrap();
        let UpdateResult::Updated(invoice) = refunded else {
            panic!("expected update, got {refunded:?}");
        };
        assert_eq!(invoice.status, PaymentStatus::Refunded);
        assert_eq!(invoice.gateway.bank_code.as_deref(), Some("NCB"));
    }

    #[tokio::test]
    async fn test_update_unknown() {
        let store = SqliteInvoiceStore::open_memory().unwrap();
        let result = store
            .update_status_by_txn_ref(
                &TxnRef::new("missing"),
                Some(PaymentStatus::Pending),
                PaymentStatus::Completed,
                None,
            )
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::NotFound);
    }

    #[tokio::test]
    async fn test_list_by_customer_newest_first() {
        let store = SqliteInvoiceStore::open_memory().unwrap();
        for r in ["1", "2", "3"] {
            store.create(new_invoice(r, "c1")).await.unwrap();
        }
        store.create(new_invoice("4", "c2")).await.unwrap();

        let listed = store.list_by_customer("c1").await.unwrap();
        let refs: Vec<&str> = listed.iter().map(|i| i.txn_ref.as_str()).collect();
        assert_eq!(refs, vec!["3", "2", "1"]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoices.db");

        let id = {
            let store = SqliteInvoiceStore::open(&path).unwrap();
            let created = store.create(new_invoice("1000001", "c1")).await.unwrap();
            store
                .update_status_by_txn_ref(
                    &created.txn_ref,
                    Some(PaymentStatus::Pending),
                    PaymentStatus::Completed,
                    None,
                )
                .await
                .unwrap();
            created.id
        };

        let store = SqliteInvoiceStore::open(&path).unwrap();
        let invoice = store.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(invoice.status, PaymentStatus::Completed);
    }
}
