//! Promotion repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use thinkpad_store_core::{Discount, PromotionId};

use super::{RepositoryError, like_pattern};
use crate::models::{Promotion, PromotionInput};

const PROMOTION_COLUMNS: &str = "id, name, description, start_date, end_date, discount";

/// Repository for promotion database operations.
pub struct PromotionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromotionRepository<'a> {
    /// Create a new promotion repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Discounts of every promotion active at `at` (bounds inclusive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_discounts(&self, at: DateTime<Utc>) -> Result<Vec<Discount>, RepositoryError> {
        let rows: Vec<(Discount,)> = sqlx::query_as(
            r"
            SELECT discount
            FROM store.promotion
            WHERE start_date <= $1 AND end_date >= $1
            ORDER BY id
            ",
        )
        .bind(at)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(discount,)| discount).collect())
    }

    /// List promotions ordered by ID.
    ///
    /// `search` matches a case-insensitive substring of the name; `active`
    /// keeps only promotions that are (or are not) active at `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        active: Option<bool>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Promotion>, RepositoryError> {
        let promotions = sqlx::query_as(&format!(
            r"
            SELECT {PROMOTION_COLUMNS}
            FROM store.promotion
            WHERE ($1::text IS NULL OR name ILIKE $1)
              AND ($2::boolean IS NULL OR (start_date <= $3 AND end_date >= $3) = $2)
            ORDER BY id
            "
        ))
        .bind(search.map(like_pattern))
        .bind(active)
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        Ok(promotions)
    }

    /// Get a promotion by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PromotionId) -> Result<Option<Promotion>, RepositoryError> {
        let promotion = sqlx::query_as(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM store.promotion WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(promotion)
    }

    /// Insert a promotion. A missing start date defaults to now.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &PromotionInput) -> Result<Promotion, RepositoryError> {
        let promotion: Promotion = sqlx::query_as(&format!(
            r"
            INSERT INTO store.promotion (name, description, start_date, end_date, discount)
            VALUES ($1, $2, COALESCE($3, NOW()), $4, $5)
            RETURNING {PROMOTION_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.discount)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(promotion_id = %promotion.id, "Created promotion");
        Ok(promotion)
    }

    /// Replace a promotion's fields. A missing start date keeps the stored one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the promotion does not exist.
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: PromotionId,
        input: &PromotionInput,
    ) -> Result<Promotion, RepositoryError> {
        sqlx::query_as(&format!(
            r"
            UPDATE store.promotion
            SET name = $2, description = $3, start_date = COALESCE($4, start_date),
                end_date = $5, discount = $6
            WHERE id = $1
            RETURNING {PROMOTION_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.discount)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a promotion.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the promotion does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: PromotionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.promotion WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
