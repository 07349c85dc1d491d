//! Golden vectors for the payment URL and its signature.
//!
//! The expected digests are computed here with `hmac`/`sha2` directly, not
//! through the crate, so a regression in canonicalization or signing cannot
//! hide behind itself.

mod common;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use vnpay::core::{canonical_string, fields, sign, verify};
use vnpay::{ParamSet, SpaceEncoding};

fn reference_hmac(message: &str, secret: &str) -> String {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// A canonicalization vector.
#[derive(Debug, Serialize, Deserialize)]
struct CanonicalVector {
    name: String,
    params: Vec<(String, String)>,
    spaces: SpaceEncoding,
    canonical: String,
}

fn canonical_vectors() -> Vec<CanonicalVector> {
    let vector = |name: &str, params: &[(&str, &str)], spaces, canonical: &str| CanonicalVector {
        name: name.to_string(),
        params: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        spaces,
        canonical: canonical.to_string(),
    };

    vec![
        vector(
            "sorted_by_bytes",
            &[("vnp_TxnRef", "1"), ("vnp_Amount", "100"), ("vnp_BankCode", "NCB")],
            SpaceEncoding::Percent20,
            "vnp_Amount=100&vnp_BankCode=NCB&vnp_TxnRef=1",
        ),
        vector(
            "upper_before_lower",
            &[("vnp_b", "1"), ("vnp_B", "2"), ("vnp_a", "3")],
            SpaceEncoding::Percent20,
            "vnp_B=2&vnp_a=3&vnp_b=1",
        ),
        vector(
            "space_percent20",
            &[("vnp_OrderInfo", "Thanh toan don hang")],
            SpaceEncoding::Percent20,
            "vnp_OrderInfo=Thanh%20toan%20don%20hang",
        ),
        vector(
            "space_plus",
            &[("vnp_OrderInfo", "Thanh toan don hang")],
            SpaceEncoding::Plus,
            "vnp_OrderInfo=Thanh+toan+don+hang",
        ),
        vector(
            "reserved_and_unreserved",
            &[("vnp_ReturnUrl", "https://a.vn/r?x=1&y=~_.-")],
            SpaceEncoding::Percent20,
            "vnp_ReturnUrl=https%3A%2F%2Fa.vn%2Fr%3Fx%3D1%26y%3D~_.-",
        ),
        vector(
            "utf8_upper_hex",
            &[("vnp_OrderInfo", "Hoàn")],
            SpaceEncoding::Percent20,
            "vnp_OrderInfo=Ho%C3%A0n",
        ),
        vector(
            "empty_value",
            &[("vnp_BankCode", ""), ("vnp_Amount", "1")],
            SpaceEncoding::Percent20,
            "vnp_Amount=1&vnp_BankCode=",
        ),
    ]
}

#[test]
fn test_canonical_vectors() {
    for v in canonical_vectors() {
        let params: ParamSet = v.params.iter().cloned().collect();
        assert_eq!(canonical_string(&params, v.spaces), v.canonical, "{}", v.name);

        let reversed: ParamSet = v.params.iter().rev().cloned().collect();
        assert_eq!(canonical_string(&reversed, v.spaces), v.canonical, "{} reversed", v.name);
    }
}

#[test]
fn test_sign_matches_reference_hmac() {
    for v in canonical_vectors() {
        let expected = reference_hmac(&v.canonical, common::SECRET);
        assert_eq!(sign(&v.canonical, common::SECRET.as_bytes()), expected, "{}", v.name);
        assert!(verify(&v.canonical, common::SECRET.as_bytes(), &expected));
    }
}

#[tokio::test]
async fn test_create_payment_end_to_end() {
    let gateway = common::memory_gateway();
    let created = gateway
        .create_payment(common::payment(100_000).with_bank_code("NCB"))
        .await
        .unwrap();

    let (base, query) = created.payment_url.split_once('?').unwrap();
    assert_eq!(base, gateway.config().payment_url);

    let (canonical, hash_pair) = query.rsplit_once('&').unwrap();
    assert_eq!(hash_pair, format!("vnp_SecureHash={}", created.secure_hash));
    assert_eq!(canonical, canonical_string(&created.params, SpaceEncoding::Percent20));

    let keys: Vec<&str> = canonical
        .split('&')
        .map(|pair| pair.split_once('=').unwrap().0)
        .collect();
    assert_eq!(
        keys,
        [
            "vnp_Amount",
            "vnp_BankCode",
            "vnp_Command",
            "vnp_CreateDate",
            "vnp_CurrCode",
            "vnp_ExpireDate",
            "vnp_IpAddr",
            "vnp_Locale",
            "vnp_OrderInfo",
            "vnp_OrderType",
            "vnp_ReturnUrl",
            "vnp_TmnCode",
            "vnp_TxnRef",
            "vnp_Version",
        ]
    );

    assert_eq!(created.params.get(fields::AMOUNT), Some("10000000"));
    assert_eq!(created.params.get(fields::TMN_CODE), Some(common::TMN_CODE));
    assert_eq!(created.params.get(fields::CURR_CODE), Some("VND"));
    assert_eq!(created.params.get(fields::CREATE_DATE), Some("20240101070000"));
    assert_eq!(created.params.get(fields::EXPIRE_DATE), Some("20240101071500"));
    assert_eq!(
        created.params.get(fields::ORDER_INFO),
        Some(format!("Thanh toan cho don hang {}", created.invoice_number).as_str())
    );

    assert_eq!(created.secure_hash, reference_hmac(canonical, common::SECRET));
    assert_eq!(created.secure_hash.len(), 128);
    assert!(created.secure_hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
}

#[tokio::test]
async fn test_create_payment_is_deterministic() {
    let a = common::memory_gateway().create_payment(common::payment(100_000)).await.unwrap();
    let b = common::memory_gateway().create_payment(common::payment(100_000)).await.unwrap();
    assert_eq!(a.payment_url, b.payment_url);
    assert!(!a.params.contains(fields::BANK_CODE));

    // Fixed clock, first sequential TxnRef, default sandbox settings.
    assert_eq!(
        a.secure_hash,
        "17bab335a57b8047acce4619c7d76f01ad1a91b841755c21295e6489704cd0dbf6e6b2a4ca5543ece3ee1a03bde019b35ac9a2f3dc7317ae30f6933c0affdd27"
    );
}

#[tokio::test]
async fn test_fractional_amount_truncates() {
    let gateway = common::memory_gateway();
    let request = vnpay::PaymentRequest::new(
        "cust-1",
        "ticket-1",
        rust_decimal::Decimal::new(1_000_005, 3),
        "127.0.0.1",
    );
    let created = gateway.create_payment(request).await.unwrap();
    // 1000.005 major units is 100000.5 minor units, truncated.
    assert_eq!(created.params.get(fields::AMOUNT), Some("100000"));
}
