//! Cart repository for database operations.
//!
//! Items are always read joined with their product so the unit price is the
//! product's current price.

use sqlx::PgPool;
use tracing::instrument;

use thinkpad_store_core::{CartId, CartItemId, ProductId};

use super::{RepositoryError, like_pattern, map_unique_violation};
use crate::models::{CartItem, CartOwner};

const ITEM_SELECT: &str = r"
    SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, p.price AS unit_price
    FROM store.cart_item ci
    JOIN store.product p ON p.id = ci.product_id
";

const UNIQUE_CONSTRAINTS: &[(&str, &str)] = &[("cart_item_cart_product_key", "product")];

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the items of a cart ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let items = sqlx::query_as(&format!("{ITEM_SELECT} WHERE ci.cart_id = $1 ORDER BY ci.id"))
            .bind(cart_id)
            .fetch_all(self.pool)
            .await?;

        Ok(items)
    }

    /// Get one item, scoped to its cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let item = sqlx::query_as(&format!(
            "{ITEM_SELECT} WHERE ci.cart_id = $1 AND ci.id = $2"
        ))
        .bind(cart_id)
        .bind(item_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    /// Add `quantity` of a product to a cart.
    ///
    /// When the product is already in the cart the existing row's quantity is
    /// increased instead, in a single statement, and that row is returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails (including an
    /// unknown product).
    #[instrument(skip(self))]
    pub async fn add_or_merge(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let item = sqlx::query_as(
            r"
            WITH upserted AS (
                INSERT INTO store.cart_item (cart_id, product_id, quantity)
                VALUES ($1, $2, $3)
                ON CONFLICT (cart_id, product_id)
                DO UPDATE SET quantity = store.cart_item.quantity + EXCLUDED.quantity
                RETURNING id, cart_id, product_id, quantity
            )
            SELECT u.id, u.cart_id, u.product_id, u.quantity, p.price AS unit_price
            FROM upserted u
            JOIN store.product p ON p.id = u.product_id
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(self.pool)
        .await?;

        Ok(item)
    }

    /// Replace an item's product and quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item is not in this cart.
    /// Returns `RepositoryError::Conflict("product")` if the cart already holds
    /// the new product in another row.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        sqlx::query_as(
            r"
            WITH updated AS (
                UPDATE store.cart_item
                SET product_id = $3, quantity = $4
                WHERE cart_id = $1 AND id = $2
                RETURNING id, cart_id, product_id, quantity
            )
            SELECT u.id, u.cart_id, u.product_id, u.quantity, p.price AS unit_price
            FROM updated u
            JOIN store.product p ON p.id = u.product_id
            ",
        )
        .bind(cart_id)
        .bind(item_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, UNIQUE_CONSTRAINTS))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Remove an item from a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item is not in this cart.
    #[instrument(skip(self))]
    pub async fn delete_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.cart_item WHERE cart_id = $1 AND id = $2")
            .bind(cart_id)
            .bind(item_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List carts with their owners, optionally filtered by a case-insensitive
    /// substring of the owner's username or email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_carts(&self, search: Option<&str>) -> Result<Vec<CartOwner>, RepositoryError> {
        let carts = sqlx::query_as(
            r"
            SELECT c.id, c.user_id, u.username, u.email
            FROM store.cart c
            JOIN store.user u ON u.id = c.user_id
            WHERE $1::text IS NULL OR u.username ILIKE $1 OR u.email ILIKE $1
            ORDER BY c.id
            ",
        )
        .bind(search.map(like_pattern))
        .fetch_all(self.pool)
        .await?;

        Ok(carts)
    }

    /// Items of several carts at once, ordered by cart then item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for_carts(&self, cart_ids: &[CartId]) -> Result<Vec<CartItem>, RepositoryError> {
        let ids: Vec<i32> = cart_ids.iter().map(CartId::as_i32).collect();
        let items = sqlx::query_as(&format!(
            "{ITEM_SELECT} WHERE ci.cart_id = ANY($1) ORDER BY ci.cart_id, ci.id"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }
}
