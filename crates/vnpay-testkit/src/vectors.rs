//! Golden test vectors for deterministic verification.
//!
//! Each vector fixes a parameter set, the space encoding and the secret, and
//! records the canonical string and HMAC-SHA512 digest the gateway expects.
//! The digests were produced by an independent HMAC implementation.

use serde::Serialize;
use vnpay_core::{canonical_string, sign, ParamSet, SpaceEncoding};

/// A golden test vector.
#[derive(Debug, Clone, Serialize)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Parameters in arbitrary (not sorted) order.
    pub params: &'static [(&'static str, &'static str)],
    pub spaces: SpaceEncoding,
    pub secret: &'static str,
    /// Expected canonical string.
    pub expected_canonical: &'static str,
    /// Expected lower-case hex digest.
    pub expected_hash: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "payment_100000_vnd",
            params: &[
                ("vnp_Version", "2.1.0"),
                ("vnp_Command", "pay"),
                ("vnp_TmnCode", "TEST01"),
                ("vnp_Amount", "10000000"),
                ("vnp_CreateDate", "20240101070000"),
                ("vnp_CurrCode", "VND"),
                ("vnp_ExpireDate", "20240101071500"),
                ("vnp_IpAddr", "127.0.0.1"),
                ("vnp_Locale", "vn"),
                ("vnp_OrderInfo", "Thanh toan cho don hang INV-20240101-000000"),
                ("vnp_OrderType", "other"),
                ("vnp_ReturnUrl", "https://shop.example.vn/vnpay/return"),
                ("vnp_TxnRef", "1000001"),
            ],
            spaces: SpaceEncoding::Percent20,
            secret: "SECRET",
            expected_canonical: "vnp_Amount=10000000&vnp_Command=pay&vnp_CreateDate=20240101070000&vnp_CurrCode=VND&vnp_ExpireDate=20240101071500&vnp_IpAddr=127.0.0.1&vnp_Locale=vn&vnp_OrderInfo=Thanh%20toan%20cho%20don%20hang%20INV-20240101-000000&vnp_OrderType=other&vnp_ReturnUrl=https%3A%2F%2Fshop.example.vn%2Fvnpay%2Freturn&vnp_TmnCode=TEST01&vnp_TxnRef=1000001&vnp_Version=2.1.0",
            expected_hash: "17bab335a57b8047acce4619c7d76f01ad1a91b841755c21295e6489704cd0dbf6e6b2a4ca5543ece3ee1a03bde019b35ac9a2f3dc7317ae30f6933c0affdd27",
        },
        GoldenVector {
            name: "ipn_success",
            params: &[
                ("vnp_TxnRef", "1000001"),
                ("vnp_TransactionStatus", "00"),
                ("vnp_TransactionNo", "14226112"),
                ("vnp_TmnCode", "TEST01"),
                ("vnp_ResponseCode", "00"),
                ("vnp_PayDate", "20240101071203"),
                ("vnp_OrderInfo", "Thanh toan cho don hang"),
                ("vnp_BankCode", "NCB"),
                ("vnp_Amount", "10000000"),
            ],
            spaces: SpaceEncoding::Percent20,
            secret: "SECRET",
            expected_canonical: "vnp_Amount=10000000&vnp_BankCode=NCB&vnp_OrderInfo=Thanh%20toan%20cho%20don%20hang&vnp_PayDate=20240101071203&vnp_ResponseCode=00&vnp_TmnCode=TEST01&vnp_TransactionNo=14226112&vnp_TransactionStatus=00&vnp_TxnRef=1000001",
            expected_hash: "b03f82beb00cd7aa63ca870b58c7b46bf3544aee87fbeeec7760a9038a259eab459d119326663fd1f2ac808da4fcf817ee869eb06404db1ec7df1aa7b2fa6b56",
        },
        GoldenVector {
            name: "plus_spaces",
            params: &[
                ("vnp_TxnRef", "1000001"),
                ("vnp_OrderInfo", "Thanh toan don hang"),
            ],
            spaces: SpaceEncoding::Plus,
            secret: "SECRET",
            expected_canonical: "vnp_OrderInfo=Thanh+toan+don+hang&vnp_TxnRef=1000001",
            expected_hash: "509226f5763b8c1e71380f378432c6eb9a55f0044259ddc0520fa41e3f1faa01893c28a1af836e8a57448e0f73b1b8963bbf66613a550fe9a15d51405b4c7c32",
        },
        GoldenVector {
            name: "empty_value",
            params: &[("vnp_BankCode", ""), ("vnp_Amount", "1")],
            spaces: SpaceEncoding::Percent20,
            secret: "SECRET",
            expected_canonical: "vnp_Amount=1&vnp_BankCode=",
            expected_hash: "b136a5a311330a02ecd2080121a376cf840c8ea8c14ed210d3528ee59f310570f430c10c1aaf276697b28283277a66ff1e7a97061502deba7735119a515d381b",
        },
        GoldenVector {
            name: "unicode_order_info",
            params: &[
                ("vnp_TxnRef", "42"),
                ("vnp_OrderInfo", "Ho\u{e0}n ti\u{1ec1}n giao d\u{1ecb}ch"),
            ],
            spaces: SpaceEncoding::Percent20,
            secret: "K3Y-with-\u{fc}n\u{ef}code",
            expected_canonical: "vnp_OrderInfo=Ho%C3%A0n%20ti%E1%BB%81n%20giao%20d%E1%BB%8Bch&vnp_TxnRef=42",
            expected_hash: "d5d5d5a86a83c6db33693f540b4c28a52c55001d8e37bb98962cb69e9549b93ecd143fcadcc9e1d08a24ccb17504ad9a8da311c23d5c546b658bedad1fbf3383",
        },
    ]
}

/// Build the canonical string for a vector.
pub fn canonical_from_vector(vector: &GoldenVector) -> String {
    let params: ParamSet = vector.params.iter().copied().collect();
    canonical_string(&params, vector.spaces)
}

/// Check every vector's canonical string and digest.
///
/// Returns `(name, matches, computed_digest)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let canonical = canonical_from_vector(v);
            let digest = sign(&canonical, v.secret.as_bytes());
            let matches = canonical == v.expected_canonical && digest == v.expected_hash;
            (v.name.to_string(), matches, digest)
        })
        .collect()
}

/// All vectors as pretty-printed JSON, for other implementations to consume.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&all_vectors())
}
