//! Monetary amounts and their minor-unit wire form.
//!
//! The gateway carries amounts as integers equal to the amount multiplied by
//! 100. The conversion **truncates** any fraction left after the
//! multiplication; it never rounds.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Minor units per major unit on the wire.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Convert an amount to the gateway's minor-unit integer (truncating).
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    amount
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
        .ok_or(CoreError::AmountOutOfRange)?
        .trunc()
        .to_i64()
        .ok_or(CoreError::AmountOutOfRange)
}

/// Convert a minor-unit integer back to an amount.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2).normalize()
}

/// Parse a minor-unit wire value such as `"10000000"`.
pub fn parse_minor_units(value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| CoreError::InvalidAmount(value.to_string()))
}

/// The amounts carried by an invoice.
///
/// `final_amount` is always `total - discount + tax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amounts {
    pub total: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub final_amount: Decimal,
}

impl Amounts {
    /// Compute the amounts for an invoice, rejecting negative components and a
    /// non-positive final amount.
    pub fn new(total: Decimal, discount: Decimal, tax: Decimal) -> Result<Self> {
        for (name, value) in [("total", total), ("discount", discount), ("tax", tax)] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(CoreError::InvalidAmount(format!("{name} is negative: {value}")));
            }
        }

        let final_amount = total
            .checked_sub(discount)
            .and_then(|v| v.checked_add(tax))
            .ok_or(CoreError::AmountOutOfRange)?;

        if final_amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "final amount must be positive, got {final_amount}"
            )));
        }

        Ok(Self {
            total,
            discount,
            tax,
            final_amount,
        })
    }

    /// The final amount in minor units.
    pub fn final_minor_units(&self) -> Result<i64> {
        to_minor_units(self.final_amount)
    }
}
