//! Proptest generators for property-based testing.

use proptest::prelude::*;
use rust_decimal::Decimal;

use vnpay_core::{fields, sign_params, ParamSet, SpaceEncoding, TxnRef};

/// Generate a gateway parameter name.
pub fn param_name() -> impl Strategy<Value = String> {
    "vnp_[A-Za-z]{1,16}".prop_map(String::from)
}

/// Generate a parameter value: ASCII, reserved characters, spaces and
/// multi-byte text.
pub fn param_value() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9]{0,24}".prop_map(String::from),
        "[ -~]{0,24}".prop_map(String::from),
        any::<String>(),
        Just("Thanh toán đơn hàng".to_string()),
    ]
}

/// Generate a parameter set of up to `max_len` entries, never containing the
/// signature fields.
pub fn param_set(max_len: usize) -> impl Strategy<Value = ParamSet> {
    prop::collection::btree_map(param_name(), param_value(), 0..=max_len).prop_map(|map| {
        let mut params = ParamSet::from(map);
        for name in fields::SIGNATURE_FIELDS {
            params.remove(name);
        }
        params
    })
}

/// Generate a space encoding mode.
pub fn space_encoding() -> impl Strategy<Value = SpaceEncoding> {
    prop_oneof![Just(SpaceEncoding::Percent20), Just(SpaceEncoding::Plus)]
}

/// Generate a VND amount with at most two decimal places.
pub fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000_000_000, 0u32..=2).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

/// Generate a TxnRef in the range the random id generator uses.
pub fn txn_ref() -> impl Strategy<Value = TxnRef> {
    (1_000_000u32..=10_999_998).prop_map(|n| TxnRef::new(n.to_string()))
}

/// Generate a gateway response code, biased towards success.
pub fn response_code() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => Just("00".to_string()),
        1 => prop::sample::select(vec!["07", "09", "11", "24", "51", "65", "75", "99"])
            .prop_map(String::from),
    ]
}

/// The fields of a gateway callback.
#[derive(Debug, Clone)]
pub struct CallbackParams {
    pub txn_ref: TxnRef,
    pub amount_minor: i64,
    pub response_code: String,
    pub transaction_status: String,
    pub bank_code: String,
    pub transaction_no: String,
    pub order_info: String,
    pub spaces: SpaceEncoding,
    /// Non-gateway parameters a proxy or tracker may add.
    pub extra: Vec<(String, String)>,
}

impl Arbitrary for CallbackParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            txn_ref(),
            1i64..=1_000_000_000_000,
            response_code(),
            response_code(),
            "[A-Z]{2,8}",
            "[0-9]{8}",
            param_value(),
            space_encoding(),
            prop::collection::vec(("utm_[a-z]{1,8}", "[a-z0-9]{0,8}"), 0..3),
        )
            .prop_map(
                |(txn_ref, amount_minor, response_code, transaction_status, bank_code, transaction_no, order_info, spaces, extra)| {
                    CallbackParams {
                        txn_ref,
                        amount_minor,
                        response_code,
                        transaction_status,
                        bank_code,
                        transaction_no,
                        order_info,
                        spaces,
                        extra,
                    }
                },
            )
            .boxed()
    }
}

impl CallbackParams {
    /// The unsigned parameter set, extras included.
    pub fn to_param_set(&self) -> ParamSet {
        let mut params = ParamSet::new()
            .with(fields::AMOUNT, self.amount_minor.to_string())
            .with(fields::BANK_CODE, self.bank_code.as_str())
            .with(fields::ORDER_INFO, self.order_info.as_str())
            .with(fields::RESPONSE_CODE, self.response_code.as_str())
            .with(fields::TRANSACTION_NO, self.transaction_no.as_str())
            .with(fields::TRANSACTION_STATUS, self.transaction_status.as_str())
            .with(fields::TXN_REF, self.txn_ref.as_str());
        for (name, value) in &self.extra {
            params.insert(name.as_str(), value.as_str());
        }
        params
    }

    /// The parameter set with `vnp_SecureHash` attached.
    pub fn signed(&self, secret: &[u8]) -> ParamSet {
        let mut params = self.to_param_set();
        let hash = sign_params(&params, secret, self.spaces);
        params.insert(fields::SECURE_HASH, hash);
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vnpay_core::{canonical_string, parse_query, sign, to_minor_units, verify, verify_params};

    proptest! {
        #[test]
        fn test_canonical_independent_of_insertion_order(
            entries in prop::collection::vec((param_name(), param_value()), 0..12),
            spaces in space_encoding(),
        ) {
            // First occurrence wins in both directions so the sets are equal.
            let mut forward = ParamSet::new();
            for (k, v) in &entries {
                if !forward.contains(k) {
                    forward.insert(k.as_str(), v.as_str());
                }
            }
            let mut backward = ParamSet::new();
            for (k, _) in entries.iter().rev() {
                if !backward.contains(k) {
                    backward.insert(k.as_str(), forward.get_or_empty(k));
                }
            }
            prop_assert_eq!(canonical_string(&forward, spaces), canonical_string(&backward, spaces));
        }

        #[test]
        fn test_canonical_only_unreserved_or_escaped(params in param_set(8), spaces in space_encoding()) {
            let canonical = canonical_string(&params, spaces);
            prop_assert!(canonical
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"-_.~%=&+".contains(&b)));
        }

        #[test]
        fn test_query_string_decodes_to_same_set(params in param_set(8)) {
            let canonical = canonical_string(&params, SpaceEncoding::Percent20);
            prop_assert_eq!(parse_query(&canonical), params);
        }

        #[test]
        fn test_signed_callback_verifies(callback: CallbackParams) {
            let params = callback.signed(b"SECRET");
            prop_assert!(verify_params(&params, b"SECRET", callback.spaces));
            prop_assert!(!verify_params(&params, b"SECRET!", callback.spaces));
        }

        #[test]
        fn test_single_bit_flip_in_message_fails(
            params in param_set(6),
            bit in 0usize..8,
            pos in any::<prop::sample::Index>(),
        ) {
            let canonical = canonical_string(&params, SpaceEncoding::Percent20);
            prop_assume!(!canonical.is_empty());
            let digest = sign(&canonical, b"SECRET");

            let mut bytes = canonical.into_bytes();
            let i = pos.index(bytes.len());
            bytes[i] ^= 1 << bit;
            let mutated = String::from_utf8_lossy(&bytes);
            prop_assert!(!verify(&mutated, b"SECRET", &digest));
        }

        #[test]
        fn test_minor_units_truncate(amount in amount()) {
            let minor = to_minor_units(amount).unwrap();
            let exact = amount * Decimal::from(100);
            prop_assert!(Decimal::from(minor) <= exact);
            prop_assert!(exact - Decimal::from(minor) < Decimal::ONE);
        }
    }
}
