//! Fixed-point money.
//!
//! Amounts are `BigDecimal`s normalized to two decimal places (half-up), the
//! precision the finance office books in. Comparisons never go through floats.

use core::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Number of decimal places amounts are booked at.
pub const CURRENCY_SCALE: i64 = 2;

/// Longest accepted textual amount (digits plus separator).
const MAX_INPUT_LEN: usize = 32;

/// Upper bound on accepted scale/exponent when deserializing decimals.
const MAX_EXPONENT: i64 = 32;

/// Digits allowed before the decimal point. Matches the `NUMERIC(18, 2)`
/// amount column.
pub const MAX_INTEGER_DIGITS: u32 = 16;

/// Round a decimal to currency precision (two places, half-up).
pub fn round_currency(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(CURRENCY_SCALE, RoundingMode::HalfUp)
}

/// A strictly positive monetary amount at currency precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "BigDecimal", into = "BigDecimal")]
pub struct Amount(BigDecimal);

impl Amount {
    /// Parse user-facing text (`"8000000"`, `"4999.99"`).
    ///
    /// Only plain decimal notation is accepted: no sign, no exponent, no
    /// thousands separators.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("amount is required"));
        }
        if trimmed.starts_with('-') {
            return Err(DomainError::validation("amount must be positive"));
        }
        if trimmed.len() > MAX_INPUT_LEN || !is_plain_decimal(trimmed) {
            return Err(DomainError::validation(format!(
                "'{trimmed}' is not a valid amount"
            )));
        }

        let value = BigDecimal::from_str(trimmed)
            .map_err(|e| DomainError::validation(format!("'{trimmed}' is not a valid amount: {e}")))?;
        Self::try_from(value)
    }

    pub fn as_decimal(&self) -> &BigDecimal {
        &self.0
    }

    pub fn into_decimal(self) -> BigDecimal {
        self.0
    }
}

fn is_plain_decimal(s: &str) -> bool {
    let (whole, fraction) = match s.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (s, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());

    digits(whole) && fraction.is_none_or(digits)
}

impl TryFrom<BigDecimal> for Amount {
    type Error = DomainError;

    fn try_from(value: BigDecimal) -> Result<Self, Self::Error> {
        let (_, exponent) = value.as_bigint_and_exponent();
        if !(-MAX_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
            return Err(DomainError::validation("amount is out of range"));
        }

        let rounded = round_currency(&value);
        if rounded <= BigDecimal::zero() {
            return Err(DomainError::validation("amount must be positive"));
        }
        if rounded >= BigDecimal::from(10_u64.pow(MAX_INTEGER_DIGITS)) {
            return Err(DomainError::validation(format!(
                "amount must have at most {MAX_INTEGER_DIGITS} digits before the decimal point"
            )));
        }
        Ok(Self(rounded))
    }
}

impl From<Amount> for BigDecimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl FromStr for Amount {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl ValueObject for Amount {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(Amount::parse("8000000").unwrap().to_string(), "8000000.00");
        assert_eq!(Amount::parse(" 4999.99 ").unwrap().to_string(), "4999.99");
    }

    #[test]
    fn rounds_half_up_to_two_places() {
        assert_eq!(Amount::parse("0.005").unwrap().to_string(), "0.01");
        assert_eq!(Amount::parse("10.004").unwrap().to_string(), "10.00");
    }

    #[test]
    fn rejects_non_positive_and_non_numeric_text() {
        for input in ["", "  ", "0", "0.00", "0.001", "-5", "abc", "1e3", "1,000", "NaN", "inf", "1.", ".5"] {
            assert!(Amount::parse(input).is_err(), "expected {input:?} to be rejected");
        }
    }

    #[test]
    fn amounts_beyond_sixteen_integer_digits_are_rejected() {
        assert_eq!(
            Amount::parse("9999999999999999.99").unwrap().to_string(),
            "9999999999999999.99"
        );
        for input in ["10000000000000000", "99999999999999999999.99", "9999999999999999.995"] {
            assert!(Amount::parse(input).is_err(), "expected {input:?} to be rejected");
        }
        assert!(serde_json::from_str::<Amount>("\"100000000000000000\"").is_err());
    }

    #[test]
    fn equal_values_are_equal_regardless_of_input_scale() {
        assert_eq!(Amount::parse("5000").unwrap(), Amount::parse("5000.000").unwrap());
    }

    #[test]
    fn deserialization_enforces_the_invariant() {
        let ok: Amount = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(ok.to_string(), "12.50");

        assert!(serde_json::from_str::<Amount>("\"-1\"").is_err());
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
    }
}
