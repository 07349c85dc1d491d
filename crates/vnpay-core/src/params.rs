//! Parameter sets: the flat string maps exchanged with the gateway.
//!
//! A [`ParamSet`] is backed by a `BTreeMap<String, String>`, so iteration is
//! always in ascending byte order of the names and a name can only appear
//! once. Both properties are required by the canonical encoding.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Gateway field names.
pub mod fields {
    /// Prefix shared by every gateway parameter.
    pub const PREFIX: &str = "vnp_";

    pub const AMOUNT: &str = "vnp_Amount";
    pub const BANK_CODE: &str = "vnp_BankCode";
    pub const BANK_TRAN_NO: &str = "vnp_BankTranNo";
    pub const CARD_TYPE: &str = "vnp_CardType";
    pub const COMMAND: &str = "vnp_Command";
    pub const CREATE_BY: &str = "vnp_CreateBy";
    pub const CREATE_DATE: &str = "vnp_CreateDate";
    pub const CURR_CODE: &str = "vnp_CurrCode";
    pub const EXPIRE_DATE: &str = "vnp_ExpireDate";
    pub const IP_ADDR: &str = "vnp_IpAddr";
    pub const LOCALE: &str = "vnp_Locale";
    pub const ORDER_INFO: &str = "vnp_OrderInfo";
    pub const ORDER_TYPE: &str = "vnp_OrderType";
    pub const PAY_DATE: &str = "vnp_PayDate";
    pub const REQUEST_ID: &str = "vnp_RequestId";
    pub const RESPONSE_CODE: &str = "vnp_ResponseCode";
    pub const RETURN_URL: &str = "vnp_ReturnUrl";
    pub const SECURE_HASH: &str = "vnp_SecureHash";
    pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";
    pub const TMN_CODE: &str = "vnp_TmnCode";
    pub const TRANSACTION_DATE: &str = "vnp_TransactionDate";
    pub const TRANSACTION_NO: &str = "vnp_TransactionNo";
    pub const TRANSACTION_STATUS: &str = "vnp_TransactionStatus";
    pub const TRANSACTION_TYPE: &str = "vnp_TransactionType";
    pub const TXN_REF: &str = "vnp_TxnRef";
    pub const VERSION: &str = "vnp_Version";

    /// Fields that carry the signature and are never part of the signed data.
    pub const SIGNATURE_FIELDS: [&str; 2] = [SECURE_HASH, SECURE_HASH_TYPE];
}

/// A set of named gateway parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, String>);

impl ParamSet {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a parameter, returning the previous value if the name was taken.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert only when a value is present.
    pub fn insert_opt(&mut self, name: impl Into<String>, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.insert(name, value);
        }
    }

    /// Get a parameter value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Get a parameter value, or the empty string when absent.
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Remove a parameter.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs in ascending byte order of the name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over the names in ascending byte order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The signed portion of a callback: every `vnp_` parameter except the
    /// signature fields themselves.
    pub fn signed_fields(&self) -> ParamSet {
        self.0
            .iter()
            .filter(|(k, _)| k.starts_with(fields::PREFIX))
            .filter(|(k, _)| !fields::SIGNATURE_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for ParamSet {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<BTreeMap<String, String>> for ParamSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl From<HashMap<String, String>> for ParamSet {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}
