//! # VNPay Store
//!
//! Storage abstraction for invoices reconciled against the gateway. Provides
//! a trait-based interface with SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`InvoiceStore`] - The async trait for all invoice persistence
//! - [`SqliteInvoiceStore`] - SQLite-based persistent storage
//! - [`MemoryInvoiceStore`] - In-memory storage for tests
//! - [`UpdateResult`] - Outcome of a conditional status update
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vnpay_store::{InvoiceStore, SqliteInvoiceStore};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteInvoiceStore::open("invoices.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteInvoiceStore::open_memory().unwrap();
//!
//!     let invoices = store.list_by_customer("cust-1").await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Conditional updates**: A status update can require the current status
//!   to match an expected value. The check and the write are one atomic step,
//!   so two concurrent callbacks for the same TxnRef cannot both win.
//! - **Unique TxnRef**: Creating a second invoice with an existing TxnRef fails.
//! - **No deletes**: Invoices are never removed.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryInvoiceStore;
pub use sqlite::SqliteInvoiceStore;
pub use traits::{InvoiceStore, UpdateResult};
