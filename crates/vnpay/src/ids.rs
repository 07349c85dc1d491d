//! Identifier generation for transaction references, request ids and
//! invoice serials.
//!
//! Generators are injected into the [`Gateway`](crate::Gateway) so tests can
//! run with deterministic ids and no process-wide random state is involved.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vnpay_core::TxnRef;

/// Source of unique identifiers.
pub trait IdGenerator: Send + Sync {
    /// A fresh transaction reference. Must not repeat for the lifetime of
    /// the store; a collision is retried by the gateway.
    fn txn_ref(&self) -> TxnRef;

    /// A `vnp_RequestId` for query and refund calls.
    fn request_id(&self) -> String;

    /// Serial used for the six-digit suffix of an invoice number.
    fn invoice_serial(&self) -> u32;
}

/// Random identifiers from a seedable generator.
///
/// TxnRefs are 7- and 8-digit numbers in `1000000..=10999998`, request ids are
/// in `1..=9999`.
pub struct RandomIds {
    rng: Mutex<StdRng>,
}

impl RandomIds {
    /// Seed from the operating system.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A poisoned generator is still a valid generator.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for RandomIds {
    fn txn_ref(&self) -> TxnRef {
        TxnRef::new(self.with_rng(|rng| rng.gen_range(1_000_000u32..=10_999_998)).to_string())
    }

    fn request_id(&self) -> String {
        self.with_rng(|rng| rng.gen_range(1u32..=9_999)).to_string()
    }

    fn invoice_serial(&self) -> u32 {
        self.with_rng(|rng| rng.gen_range(0..1_000_000))
    }
}

/// Monotonic counter. Every call to any method takes the next value.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    fn take(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::starting_at(1_000_000)
    }
}

impl IdGenerator for SequentialIds {
    fn txn_ref(&self) -> TxnRef {
        TxnRef::new(self.take().to_string())
    }

    fn request_id(&self) -> String {
        self.take().to_string()
    }

    fn invoice_serial(&self) -> u32 {
        (self.take() % 1_000_000) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_ranges() {
        let ids = RandomIds::seeded(7);
        for _ in 0..1_000 {
            let txn_ref: u32 = ids.txn_ref().as_str().parse().unwrap();
            assert!((1_000_000..=10_999_998).contains(&txn_ref));

            let request_id: u32 = ids.request_id().parse().unwrap();
            assert!((1..=9_999).contains(&request_id));

            assert!(ids.invoice_serial() < 1_000_000);
        }
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let a = RandomIds::seeded(42);
        let b = RandomIds::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.txn_ref(), b.txn_ref());
        }
    }

    #[test]
    fn test_sequential_unique() {
        let ids = SequentialIds::starting_at(5);
        assert_eq!(ids.txn_ref().as_str(), "5");
        assert_eq!(ids.request_id(), "6");
        assert_eq!(ids.invoice_serial(), 7);

        let refs: HashSet<TxnRef> = (0..100).map(|_| ids.txn_ref()).collect();
        assert_eq!(refs.len(), 100);
    }
}
