//! Cart pricing.
//!
//! A line's original total is `quantity × unit price`. Every promotion active
//! at pricing time multiplies it by its rate (`discount / 10`); the result is
//! rounded to cents half away from zero.

use rust_decimal::Decimal;

use thinkpad_store_core::{Discount, Price, round_money};

/// Combined multiplier of all active discounts. `1` when none apply.
#[must_use]
pub fn combined_rate(discounts: &[Discount]) -> Decimal {
    discounts
        .iter()
        .fold(Decimal::ONE, |rate, discount| rate * discount.rate())
}

/// `quantity × unit_price` with two decimal places.
#[must_use]
pub fn line_total(unit_price: Price, quantity: i32) -> Decimal {
    round_money(unit_price.amount() * Decimal::from(quantity))
}

/// Apply `rate` to `amount`, rounding to cents.
#[must_use]
pub fn discounted(amount: Decimal, rate: Decimal) -> Decimal {
    round_money(amount * rate)
}
