//! Decimal money values.
//!
//! Prices are stored as `NUMERIC(10, 2)`: at most ten digits in total, two of
//! them after the decimal point. [`parse_decimal_field`] applies the same
//! digit rules to any user-supplied decimal (budgets, admin price input).

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors produced when validating a decimal input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecimalFieldError {
    /// Not a decimal number at all.
    #[error("A valid number is required.")]
    Invalid,
    /// Too many digits overall.
    #[error("Ensure that there are no more than {0} digits in total.")]
    MaxDigits(u32),
    /// Too many digits after the decimal point.
    #[error("Ensure that there are no more than {0} decimal places.")]
    MaxDecimalPlaces(u32),
    /// Too many digits before the decimal point.
    #[error("Ensure that there are no more than {0} digits before the decimal point.")]
    MaxWholeDigits(u32),
}

/// Parse a decimal string and check it against a `max_digits` /
/// `decimal_places` column definition.
///
/// The returned value always carries exactly `decimal_places` fractional
/// digits, so `"6000"` becomes `6000.00` for a two-place column.
///
/// # Errors
///
/// Returns a [`DecimalFieldError`] describing the first violated rule.
///
/// ```
/// use thinkpad_store_core::parse_decimal_field;
///
/// assert_eq!(parse_decimal_field("6000", 10, 2).unwrap().to_string(), "6000.00");
/// assert!(parse_decimal_field("1.234", 10, 2).is_err());
/// ```
pub fn parse_decimal_field(
    input: &str,
    max_digits: u32,
    decimal_places: u32,
) -> Result<Decimal, DecimalFieldError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DecimalFieldError::Invalid);
    }
    let mut value: Decimal = trimmed.parse().map_err(|_| DecimalFieldError::Invalid)?;

    let decimals = value.scale();
    let digit_count = u32::try_from(value.mantissa().unsigned_abs().to_string().len())
        .map_err(|_| DecimalFieldError::Invalid)?;
    let total_digits = digit_count.max(decimals);
    let whole_digits = total_digits - decimals;

    if total_digits > max_digits {
        return Err(DecimalFieldError::MaxDigits(max_digits));
    }
    if decimals > decimal_places {
        return Err(DecimalFieldError::MaxDecimalPlaces(decimal_places));
    }
    if whole_digits > max_digits - decimal_places {
        return Err(DecimalFieldError::MaxWholeDigits(
            max_digits - decimal_places,
        ));
    }

    value.rescale(decimal_places);
    Ok(value)
}

/// Round a computed amount to cents (half away from zero) with exactly two
/// fractional digits.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Errors produced when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Input failed decimal validation.
    #[error(transparent)]
    Decimal(#[from] DecimalFieldError),
    /// Prices cannot be negative.
    #[error("Ensure this value is greater than or equal to 0.")]
    Negative,
}

/// A non-negative product price with two decimal places.
///
/// Serializes as a string (`"5999.00"`), matching how the API renders
/// every money field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Maximum number of digits in a price.
    pub const MAX_DIGITS: u32 = 10;
    /// Number of fractional digits in a price.
    pub const DECIMAL_PLACES: u32 = 2;

    /// Parse a price from user input.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed input, too many digits, or a negative value.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let value = parse_decimal_field(input, Self::MAX_DIGITS, Self::DECIMAL_PLACES)?;
        Self::try_from(value)
    }

    /// The zero price.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(PriceError::Negative);
        }
        let rendered = value.to_string();
        let value = parse_decimal_field(&rendered, Self::MAX_DIGITS, Self::DECIMAL_PLACES)?;
        Ok(Self(value))
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let mut amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // NUMERIC(10, 2) guarantees the range; normalise the scale only
        amount.rescale(Self::DECIMAL_PLACES);
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_parse_decimal_field_pads_scale() {
        assert_eq!(parse_decimal_field("6000", 10, 2).unwrap().to_string(), "6000.00");
        assert_eq!(parse_decimal_field("0.5", 10, 2).unwrap().to_string(), "0.50");
        assert_eq!(parse_decimal_field("-12.3", 10, 2).unwrap().to_string(), "-12.30");
    }

    #[test]
    fn test_parse_decimal_field_rejects_garbage() {
        assert_eq!(parse_decimal_field("", 10, 2), Err(DecimalFieldError::Invalid));
        assert_eq!(parse_decimal_field("cheap", 10, 2), Err(DecimalFieldError::Invalid));
    }

    #[test]
    fn test_parse_decimal_field_digit_limits() {
        assert_eq!(
            parse_decimal_field("1.234", 10, 2),
            Err(DecimalFieldError::MaxDecimalPlaces(2))
        );
        assert_eq!(
            parse_decimal_field("123456789.12", 10, 2),
            Err(DecimalFieldError::MaxDigits(10))
        );
        assert_eq!(
            parse_decimal_field("123456789", 10, 2),
            Err(DecimalFieldError::MaxWholeDigits(8))
        );
        assert!(parse_decimal_field("12345678.99", 10, 2).is_ok());
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(Decimal::from_str("10.005").unwrap()).to_string(), "10.01");
        assert_eq!(round_money(Decimal::from_str("10.004").unwrap()).to_string(), "10.00");
        assert_eq!(round_money(Decimal::from(7)).to_string(), "7.00");
    }

    #[test]
    fn test_price_parse() {
        let price = Price::parse("5999").unwrap();
        assert_eq!(price.to_string(), "5999.00");
        assert_eq!(Price::parse("-1"), Err(PriceError::Negative));
        assert_eq!(Price::parse("0").unwrap(), Price::zero());
    }

    #[test]
    fn test_price_serde_as_string() {
        let price = Price::parse("12999.00").unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"12999.00\"");

        let parsed: Price = serde_json::from_str("\"12999.00\"").unwrap();
        assert_eq!(parsed, price);
        assert!(serde_json::from_str::<Price>("\"-5.00\"").is_err());
    }
}
