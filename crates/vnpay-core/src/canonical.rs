//! Canonical encoding of parameter sets.
//!
//! The canonical string is the exact input to the secure hash and the exact
//! query string sent to the gateway:
//!
//! - Names sorted ascending by byte value (guaranteed by [`ParamSet`])
//! - Each name and each value percent-encoded independently
//! - Pairs joined as `name=value` with `&`; an empty value is `name=`
//!
//! ## Escaping table
//!
//! The unreserved bytes `A-Z a-z 0-9 - _ . ~` are written as-is. Every other
//! byte of the UTF-8 encoding is written as `%XX` with upper-case hex digits.
//! A space is `%20` under [`SpaceEncoding::Percent20`] and `+` under
//! [`SpaceEncoding::Plus`]. Signing and verification must use the same mode.

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::params::ParamSet;

/// Bytes that are percent-encoded: everything except the unreserved set.
const ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// How a space character is written in the canonical string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpaceEncoding {
    /// `%20`, identical to every other escaped byte.
    #[default]
    Percent20,
    /// `+`, as produced by HTML form encoding.
    Plus,
}

/// Percent-encode a single name or value.
pub fn escape(input: &str, spaces: SpaceEncoding) -> Cow<'_, str> {
    let encoded: Cow<'_, str> = utf8_percent_encode(input, ESCAPE_SET).into();
    match spaces {
        SpaceEncoding::Percent20 => encoded,
        // A literal '%' is itself escaped to "%25", so "%20" can only come from a space.
        SpaceEncoding::Plus if encoded.contains("%20") => Cow::Owned(encoded.replace("%20", "+")),
        SpaceEncoding::Plus => encoded,
    }
}

/// Build the canonical string for a parameter set.
pub fn canonical_string(params: &ParamSet, spaces: SpaceEncoding) -> String {
    let mut out = String::new();
    for (i, (name, value)) in params.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(&escape(name, spaces));
        out.push('=');
        out.push_str(&escape(value, spaces));
    }
    out
}

/// Join raw values with `|` in a fixed field order.
///
/// The merchant web API can authenticate query and refund calls over this
/// layout instead of the canonical string. Missing fields contribute an empty
/// segment so the positions never shift.
pub fn pipe_joined(params: &ParamSet, order: &[&str]) -> String {
    order
        .iter()
        .map(|name| params.get_or_empty(name))
        .collect::<Vec<_>>()
        .join("|")
}

/// Parse a raw query string (without the leading `?`) into a parameter set.
///
/// `+` decodes to a space and `%XX` sequences are decoded as UTF-8 (invalid
/// sequences are replaced). When a name repeats, the first occurrence wins.
pub fn parse_query(query: &str) -> ParamSet {
    let mut params = ParamSet::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = decode_component(name);
        if params.contains(&name) {
            continue;
        }
        params.insert(name, decode_component(value));
    }
    params
}

fn decode_component(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_sorted_and_joined() {
        let params = ParamSet::new()
            .with("vnp_TxnRef", "123")
            .with("vnp_Amount", "10000000")
            .with("vnp_Command", "pay");

        assert_eq!(
            canonical_string(&params, SpaceEncoding::Percent20),
            "vnp_Amount=10000000&vnp_Command=pay&vnp_TxnRef=123"
        );
    }

    #[test]
    fn test_empty_value() {
        let params = ParamSet::new().with("vnp_BankCode", "").with("vnp_Amount", "1");
        assert_eq!(
            canonical_string(&params, SpaceEncoding::Percent20),
            "vnp_Amount=1&vnp_BankCode="
        );
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(canonical_string(&ParamSet::new(), SpaceEncoding::Percent20), "");
    }

    #[test]
    fn test_escaping_table() {
        assert_eq!(escape("AZaz09-_.~", SpaceEncoding::Percent20), "AZaz09-_.~");
        assert_eq!(escape("a b", SpaceEncoding::Percent20), "a%20b");
        assert_eq!(escape("a b", SpaceEncoding::Plus), "a+b");
        assert_eq!(escape("a+b", SpaceEncoding::Plus), "a%2Bb");
        assert_eq!(escape("100%20", SpaceEncoding::Plus), "100%2520");
        assert_eq!(
            escape("https://x.vn/return?a=1&b=2", SpaceEncoding::Percent20),
            "https%3A%2F%2Fx.vn%2Freturn%3Fa%3D1%26b%3D2"
        );
        // Multi-byte UTF-8 is escaped byte by byte.
        assert_eq!(escape("đ", SpaceEncoding::Percent20), "%C4%91");
    }

    #[test]
    fn test_names_are_escaped_too() {
        let params = ParamSet::new().with("a b", "c");
        assert_eq!(canonical_string(&params, SpaceEncoding::Percent20), "a%20b=c");
    }

    #[test]
    fn test_pipe_joined_keeps_positions() {
        let params = ParamSet::new().with("a", "1").with("c", "3");
        assert_eq!(pipe_joined(&params, &["c", "b", "a"]), "3||1");
    }

    #[test]
    fn test_parse_query() {
        let params = parse_query("vnp_OrderInfo=Thanh+toan%20don&vnp_Amount=100&vnp_Amount=200&flag");
        assert_eq!(params.get("vnp_OrderInfo"), Some("Thanh toan don"));
        assert_eq!(params.get("vnp_Amount"), Some("100"));
        assert_eq!(params.get("flag"), Some(""));
    }

    #[test]
    fn test_parse_inverts_canonical() {
        let params = ParamSet::new()
            .with("vnp_OrderInfo", "Thanh toan cho don hang INV-1")
            .with("vnp_ReturnUrl", "https://shop.vn/return?x=1")
            .with("vnp_Note", "100% + đủ");

        for spaces in [SpaceEncoding::Percent20, SpaceEncoding::Plus] {
            let encoded = canonical_string(&params, spaces);
            assert_eq!(parse_query(&encoded), params);
        }
    }
}
