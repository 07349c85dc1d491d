//! # VNPay Testkit
//!
//! Testing utilities for the VNPay gateway.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Parameter sets with their expected canonical strings and digests
//! - **Generators**: Proptest strategies for parameter sets, amounts and callbacks
//! - **Fixtures**: A deterministic gateway plus a signer for fake gateway callbacks
//!
//! ## Golden Vectors
//!
//! ```rust
//! use vnpay_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, digest) in verify_all_vectors() {
//!     assert!(ok, "{name}: {digest}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use vnpay_testkit::generators::{param_set, CallbackParams};
//!
//! proptest! {
//!     #[test]
//!     fn signed_callbacks_verify(callback: CallbackParams) {
//!         let params = callback.signed(b"SECRET");
//!         prop_assert!(vnpay_core::verify_params(&params, b"SECRET", Default::default()));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use vnpay_testkit::fixtures::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let created = fixture.create_payment(100_000).await;
//!     let ack = fixture.gateway.ipn_ack(fixture.success(&created.txn_ref, 100_000)).await;
//!     assert_eq!(ack.rsp_code, "00");
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_tracing, TestFixture, TEST_SECRET, TEST_TMN_CODE};
pub use generators::{param_set, CallbackParams};
pub use vectors::{all_vectors, canonical_from_vector, verify_all_vectors, GoldenVector};
