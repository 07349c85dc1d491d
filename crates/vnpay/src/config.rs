//! Gateway configuration.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use vnpay_core::{SpaceEncoding, DEFAULT_UTC_OFFSET_SECS};

use crate::error::{GatewayError, Result};

/// Sandbox hosted payment page.
pub const SANDBOX_PAYMENT_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";

/// Sandbox merchant web API for query and refund.
pub const SANDBOX_TRANSACTION_API_URL: &str =
    "https://sandbox.vnpayment.vn/merchant_webapi/api/transaction";

/// Return URL used when none is configured.
pub const DEFAULT_RETURN_URL: &str = "http://localhost:8080/api/vnpay/return";

/// Protocol version sent as `vnp_Version`.
pub const PROTOCOL_VERSION: &str = "2.1.0";

/// How query and refund requests are checksummed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiChecksum {
    /// HMAC over the canonical string, the same as payment URLs.
    #[default]
    Canonical,
    /// HMAC over the raw values joined with `|` in the field order the
    /// merchant web API documents for each command.
    PipeDelimited,
}

/// When a refund moves the invoice to `Refunded`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundPolicy {
    /// As soon as the signed refund request is prepared.
    ///
    /// If the caller's submission to the gateway then fails, the invoice is
    /// left `Refunded` although no money moved.
    #[default]
    Immediate,
    /// Only when [`crate::Gateway::confirm_refund`] is called after the
    /// gateway has accepted the refund.
    Deferred,
}

/// Configuration for the [`Gateway`](crate::Gateway).
#[derive(Clone)]
pub struct GatewayConfig {
    /// Merchant terminal code (`vnp_TmnCode`).
    pub tmn_code: String,
    /// Shared HMAC secret.
    pub hash_secret: SecretString,
    /// Hosted payment page the customer is redirected to.
    pub payment_url: String,
    /// Where the gateway sends the customer back (`vnp_ReturnUrl`).
    pub return_url: String,
    /// Merchant web API endpoint for query and refund calls.
    pub transaction_api_url: String,
    pub version: String,
    pub currency: String,
    /// Locale used when a payment request does not name one.
    pub default_locale: String,
    pub order_type: String,
    /// Lifetime of a payment URL (`vnp_ExpireDate - vnp_CreateDate`).
    pub payment_ttl: chrono::Duration,
    /// Offset of gateway wall-clock time, in seconds east of UTC.
    pub utc_offset_secs: i32,
    pub space_encoding: SpaceEncoding,
    pub api_checksum: ApiChecksum,
    pub refund_policy: RefundPolicy,
    /// Upper bound on every store call.
    pub store_timeout: Duration,
}

impl GatewayConfig {
    /// Sandbox defaults with the given merchant credentials.
    pub fn new(tmn_code: impl Into<String>, hash_secret: impl Into<String>) -> Self {
        Self {
            tmn_code: tmn_code.into(),
            hash_secret: SecretString::new(hash_secret.into()),
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `VNPAY_TMN_CODE`, `VNPAY_HASH_SECRET` (required)
    /// - `VNPAY_URL`, `VNPAY_RETURN_URL`, `VNPAY_TRANSACTION_API`
    /// - `VNPAY_SPACE_ENCODING` (`percent20` | `plus`)
    /// - `VNPAY_API_CHECKSUM` (`canonical` | `pipe`)
    /// - `VNPAY_REFUND_POLICY` (`immediate` | `deferred`)
    /// - `VNPAY_STORE_TIMEOUT_MS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`GatewayConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| GatewayError::Config(format!("{key} is not set")))
        };

        let mut config = Self::new(required("VNPAY_TMN_CODE")?, required("VNPAY_HASH_SECRET")?);

        if let Some(url) = lookup("VNPAY_URL") {
            config.payment_url = url;
        }
        if let Some(url) = lookup("VNPAY_RETURN_URL") {
            config.return_url = url;
        }
        if let Some(url) = lookup("VNPAY_TRANSACTION_API") {
            config.transaction_api_url = url;
        }
        if let Some(value) = lookup("VNPAY_SPACE_ENCODING") {
            config.space_encoding = match value.to_ascii_lowercase().as_str() {
                "percent20" | "%20" => SpaceEncoding::Percent20,
                "plus" | "+" => SpaceEncoding::Plus,
                other => return Err(invalid("VNPAY_SPACE_ENCODING", other)),
            };
        }
        if let Some(value) = lookup("VNPAY_API_CHECKSUM") {
            config.api_checksum = match value.to_ascii_lowercase().as_str() {
                "canonical" => ApiChecksum::Canonical,
                "pipe" | "pipe_delimited" => ApiChecksum::PipeDelimited,
                other => return Err(invalid("VNPAY_API_CHECKSUM", other)),
            };
        }
        if let Some(value) = lookup("VNPAY_REFUND_POLICY") {
            config.refund_policy = match value.to_ascii_lowercase().as_str() {
                "immediate" => RefundPolicy::Immediate,
                "deferred" => RefundPolicy::Deferred,
                other => return Err(invalid("VNPAY_REFUND_POLICY", other)),
            };
        }
        if let Some(value) = lookup("VNPAY_STORE_TIMEOUT_MS") {
            let millis = value
                .parse::<u64>()
                .map_err(|_| invalid("VNPAY_STORE_TIMEOUT_MS", &value))?;
            config.store_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    pub fn with_space_encoding(mut self, spaces: SpaceEncoding) -> Self {
        self.space_encoding = spaces;
        self
    }

    pub fn with_api_checksum(mut self, checksum: ApiChecksum) -> Self {
        self.api_checksum = checksum;
        self
    }

    pub fn with_refund_policy(mut self, policy: RefundPolicy) -> Self {
        self.refund_policy = policy;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_payment_url(mut self, url: impl Into<String>) -> Self {
        self.payment_url = url.into();
        self
    }

    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = url.into();
        self
    }

    /// The HMAC key bytes.
    pub(crate) fn secret(&self) -> &[u8] {
        self.hash_secret.expose_secret().as_bytes()
    }
}

fn invalid(key: &str, value: &str) -> GatewayError {
    GatewayError::Config(format!("invalid value for {key}: {value:?}"))
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            tmn_code: String::new(),
            hash_secret: SecretString::new(String::new()),
            payment_url: SANDBOX_PAYMENT_URL.to_string(),
            return_url: DEFAULT_RETURN_URL.to_string(),
            transaction_api_url: SANDBOX_TRANSACTION_API_URL.to_string(),
            version: PROTOCOL_VERSION.to_string(),
            currency: "VND".to_string(),
            default_locale: "vn".to_string(),
            order_type: "other".to_string(),
            payment_ttl: chrono::Duration::minutes(15),
            utc_offset_secs: DEFAULT_UTC_OFFSET_SECS,
            space_encoding: SpaceEncoding::Percent20,
            api_checksum: ApiChecksum::Canonical,
            refund_policy: RefundPolicy::Immediate,
            store_timeout: Duration::from_secs(5),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("tmn_code", &self.tmn_code)
            .field("hash_secret", &"[REDACTED]")
            .field("payment_url", &self.payment_url)
            .field("return_url", &self.return_url)
            .field("transaction_api_url", &self.transaction_api_url)
            .field("version", &self.version)
            .field("space_encoding", &self.space_encoding)
            .field("api_checksum", &self.api_checksum)
            .field("refund_policy", &self.refund_policy)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::new("TEST01", "SECRET");
        assert_eq!(config.tmn_code, "TEST01");
        assert_eq!(config.secret(), b"SECRET");
        assert_eq!(config.version, "2.1.0");
        assert_eq!(config.payment_ttl, chrono::Duration::minutes(15));
        assert_eq!(config.utc_offset_secs, 25_200);
        assert_eq!(config.space_encoding, SpaceEncoding::Percent20);
        assert_eq!(config.refund_policy, RefundPolicy::Immediate);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = GatewayConfig::new("TEST01", "super-secret-value");
        let debug = format!("{config:?}");
        assert!(debug.contains("TEST01"));
        assert!(!debug.contains("super-secret-value"));
    }

    #[test]
    fn test_from_lookup() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("VNPAY_TMN_CODE", "TMN"),
            ("VNPAY_HASH_SECRET", "KEY"),
            ("VNPAY_RETURN_URL", "https://shop.vn/return"),
            ("VNPAY_SPACE_ENCODING", "plus"),
            ("VNPAY_API_CHECKSUM", "pipe"),
            ("VNPAY_REFUND_POLICY", "Deferred"),
            ("VNPAY_STORE_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.return_url, "https://shop.vn/return");
        assert_eq!(config.payment_url, SANDBOX_PAYMENT_URL);
        assert_eq!(config.space_encoding, SpaceEncoding::Plus);
        assert_eq!(config.api_checksum, ApiChecksum::PipeDelimited);
        assert_eq!(config.refund_policy, RefundPolicy::Deferred);
        assert_eq!(config.store_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_from_lookup_requires_credentials() {
        let err = GatewayConfig::from_lookup(lookup(&[("VNPAY_TMN_CODE", "TMN")])).unwrap_err();
        assert!(matches!(err, GatewayError::Config(msg) if msg.contains("VNPAY_HASH_SECRET")));
    }

    #[test]
    fn test_from_lookup_rejects_bad_policy() {
        let err = GatewayConfig::from_lookup(lookup(&[
            ("VNPAY_TMN_CODE", "TMN"),
            ("VNPAY_HASH_SECRET", "KEY"),
            ("VNPAY_REFUND_POLICY", "later"),
        ]))
        .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
