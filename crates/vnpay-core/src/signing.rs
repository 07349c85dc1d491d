//! HMAC-SHA512 signing and verification.
//!
//! The gateway authenticates every message with a hex-encoded HMAC-SHA512 of
//! the canonical string, keyed with the merchant's hash secret. Verification
//! recomputes the digest and compares it in constant time.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::canonical::{canonical_string, SpaceEncoding};
use crate::params::{fields, ParamSet};

type HmacSha512 = Hmac<Sha512>;

/// A 64-byte HMAC-SHA512 digest.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SecureHash(pub [u8; 64]);

impl SecureHash {
    /// Compute the digest of `message` under `secret`.
    pub fn compute(message: &[u8], secret: &[u8]) -> Self {
        let mut mac =
            HmacSha512::new_from_slice(secret).expect("HMAC can take key of any size");
        mac.update(message);
        let mut out = [0u8; 64];
        out.copy_from_slice(&mac.finalize().into_bytes());
        Self(out)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to lower-case hex, the form the gateway expects.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex (either case).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 64 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Constant-time equality.
    pub fn ct_eq(&self, other: &SecureHash) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl fmt::Debug for SecureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureHash({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for SecureHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Sign a canonical string, returning the lower-case hex digest.
pub fn sign(canonical: &str, secret: &[u8]) -> String {
    SecureHash::compute(canonical.as_bytes(), secret).to_hex()
}

/// Check a claimed hex digest against a canonical string.
///
/// The claimed digest must be exactly the form [`sign`] produces: 128
/// lower-case hex characters. Anything else, upper-case hex included, is a
/// mismatch.
pub fn verify(canonical: &str, secret: &[u8], claimed: &str) -> bool {
    if !is_lower_hex_digest(claimed) {
        return false;
    }
    let Ok(claimed) = SecureHash::from_hex(claimed) else {
        return false;
    };
    SecureHash::compute(canonical.as_bytes(), secret).ct_eq(&claimed)
}

fn is_lower_hex_digest(s: &str) -> bool {
    s.len() == 128 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Sign the same fields [`verify_params`] checks: every `vnp_` parameter
/// except the signature fields.
pub fn sign_params(params: &ParamSet, secret: &[u8], spaces: SpaceEncoding) -> String {
    sign(&canonical_string(&params.signed_fields(), spaces), secret)
}

/// Verify a callback parameter set against its own `vnp_SecureHash`.
///
/// Only `vnp_`-prefixed parameters are covered by the signature; anything
/// else a proxy may have appended is ignored.
pub fn verify_params(params: &ParamSet, secret: &[u8], spaces: SpaceEncoding) -> bool {
    let Some(claimed) = params.get(fields::SECURE_HASH) else {
        return false;
    };
    let canonical = canonical_string(&params.signed_fields(), spaces);
    verify(&canonical, secret, claimed)
}
