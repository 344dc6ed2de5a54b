//! Product repository for database operations.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use thinkpad_store_core::ProductId;

use super::{RepositoryError, like_pattern};
use crate::models::{Product, ProductInput};

const PRODUCT_COLUMNS: &str = "id, name, model, price, description, stock, image, images";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every product ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        self.search(None, None).await
    }

    /// List products matching a case-insensitive substring of name or model,
    /// and/or an exact model.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        search: Option<&str>,
        model: Option<&str>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM store.product
            WHERE ($1::text IS NULL OR name ILIKE $1 OR model ILIKE $1)
              AND ($2::text IS NULL OR model = $2)
            ORDER BY id
            "
        ))
        .bind(search.map(like_pattern))
        .bind(model)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM store.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Whether a product with this ID exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM store.product WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Select assistant candidates within an optional price band.
    ///
    /// In-stock products come first, then cheaper ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn candidates(
        &self,
        budget_min: Option<Decimal>,
        budget_max: Option<Decimal>,
        limit: u8,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM store.product
            WHERE ($1::numeric IS NULL OR price >= $1)
              AND ($2::numeric IS NULL OR price <= $2)
            ORDER BY stock DESC, price ASC, id ASC
            LIMIT $3
            "
        ))
        .bind(budget_min)
        .bind(budget_max)
        .bind(i64::from(limit.max(1)))
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &ProductInput, image: &str) -> Result<Product, RepositoryError> {
        let product: Product = sqlx::query_as(&format!(
            r"
            INSERT INTO store.product (name, model, price, description, stock, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(&input.model)
        .bind(input.price)
        .bind(&input.description)
        .bind(input.stock)
        .bind(image)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(product_id = %product.id, "Created product");
        Ok(product)
    }

    /// Replace a product's fields. `image: None` keeps the current image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
        image: Option<&str>,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as(&format!(
            r"
            UPDATE store.product
            SET name = $2, model = $3, price = $4, description = $5, stock = $6,
                image = COALESCE($7, image)
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.model)
        .bind(input.price)
        .bind(&input.description)
        .bind(input.stock)
        .bind(image)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Update the product named `input.name` with model `input.model`, or
    /// insert it. Returns the product and whether it was created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, input), fields(name = %input.name, model = %input.model))]
    pub async fn upsert_by_name_and_model(
        &self,
        input: &ProductInput,
        image: Option<&str>,
    ) -> Result<(Product, bool), RepositoryError> {
        let updated: Option<Product> = sqlx::query_as(&format!(
            r"
            UPDATE store.product
            SET price = $3, description = $4, stock = $5, image = COALESCE($6, image)
            WHERE id = (
                SELECT id FROM store.product WHERE name = $1 AND model = $2
                ORDER BY id LIMIT 1
            )
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(&input.model)
        .bind(input.price)
        .bind(&input.description)
        .bind(input.stock)
        .bind(image)
        .fetch_optional(self.pool)
        .await?;

        match updated {
            Some(product) => Ok((product, false)),
            None => Ok((self.create(input, image.unwrap_or_default()).await?, true)),
        }
    }

    /// Delete a product, returning the removed row so its files can be purged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<Product, RepositoryError> {
        sqlx::query_as(&format!(
            "DELETE FROM store.product WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
