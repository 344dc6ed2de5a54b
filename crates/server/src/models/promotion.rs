//! Promotion domain types.

use chrono::{DateTime, Utc};

use thinkpad_store_core::{Discount, PromotionId};

/// A time-boxed discount applied to every cart item while active.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Promotion {
    pub id: PromotionId,
    pub name: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub discount: Discount,
}

impl Promotion {
    /// Whether the promotion applies at `at` (both bounds inclusive).
    #[must_use]
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.end_date
    }
}

/// Validated promotion fields for create and update.
///
/// A missing `start_date` means "now".
#[derive(Debug, Clone)]
pub struct PromotionInput {
    pub name: String,
    pub description: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: DateTime<Utc>,
    pub discount: Discount,
}
