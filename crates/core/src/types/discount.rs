//! Promotion discount levels.
//!
//! Discounts follow the "n-fold" convention: a discount of 8 means the buyer
//! pays 80% of the price (20% off). Valid levels are 0 through 10.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error returned for an out-of-range discount level.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Ensure this value is between 0 and 10 (got {value}).")]
pub struct DiscountError {
    /// The rejected value.
    pub value: i16,
}

/// A promotion discount level in `0..=10`.
///
/// ```
/// use thinkpad_store_core::Discount;
///
/// let discount = Discount::new(8).unwrap();
/// assert_eq!(discount.rate().to_string(), "0.8");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct Discount(i16);

impl Discount {
    /// Smallest level (everything free).
    pub const MIN: i16 = 0;
    /// Largest level (no reduction).
    pub const MAX: i16 = 10;

    /// Create a discount level.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError`] when `value` is outside `0..=10`.
    pub const fn new(value: i16) -> Result<Self, DiscountError> {
        if value < Self::MIN || value > Self::MAX {
            return Err(DiscountError { value });
        }
        Ok(Self(value))
    }

    /// The stored level.
    #[must_use]
    pub const fn level(&self) -> i16 {
        self.0
    }

    /// The price multiplier, `level / 10`.
    #[must_use]
    pub fn rate(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 1)
    }
}

impl TryFrom<i16> for Discount {
    type Error = DiscountError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Discount> for i16 {
    fn from(discount: Discount) -> Self {
        discount.0
    }
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Discount {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Discount {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let level = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(level)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Discount {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
