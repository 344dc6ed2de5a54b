//! Cart domain types.

use rust_decimal::Decimal;

use thinkpad_store_core::{CartId, CartItemId, Email, Price, ProductId, UserId, Username};

use crate::services::pricing;

/// A product line in a user's cart, joined with the product's current price.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Price,
}

impl CartItem {
    /// `quantity × unit price`, before promotions.
    #[must_use]
    pub fn original_total_price(&self) -> Decimal {
        pricing::line_total(self.unit_price, self.quantity)
    }

    /// Price after applying the combined promotion `rate`.
    #[must_use]
    pub fn total_price(&self, rate: Decimal) -> Decimal {
        pricing::discounted(self.original_total_price(), rate)
    }
}

/// A cart together with its owner, as listed on the admin surface.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartOwner {
    pub id: CartId,
    pub user_id: UserId,
    pub username: Username,
    pub email: Email,
}
