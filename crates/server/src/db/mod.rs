//! Database operations for the store `PostgreSQL` schema.
//!
//! # Schema: `store`
//!
//! ## Tables
//!
//! - `user` - Accounts (password hash, VIP and superuser flags)
//! - `cart` - One cart per user, created with the user
//! - `product` - Catalogue entries with image paths relative to the media root
//! - `cart_item` - Products in a cart, unique per (cart, product)
//! - `promotion` - Time-boxed discounts applied to every cart item
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p thinkpad-store-cli -- migrate
//! ```

pub mod carts;
pub mod products;
pub mod promotions;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use products::ProductRepository;
pub use promotions::PromotionRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation. Carries the name of the offending field.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation on `constraint` to `Conflict(field)`.
///
/// Other errors pass through as `Database`.
pub(crate) fn map_unique_violation(
    err: sqlx::Error,
    constraints: &[(&str, &str)],
) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        let field = db_err
            .constraint()
            .and_then(|name| {
                constraints
                    .iter()
                    .find(|(constraint, _)| *constraint == name)
                    .map(|(_, field)| *field)
            })
            .unwrap_or("non_field_errors");
        return RepositoryError::Conflict(field.to_owned());
    }
    RepositoryError::Database(err)
}

/// Build a `%term%` pattern for `ILIKE`, escaping wildcards in the term.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("x1"), "%x1%");
        assert_eq!(like_pattern(" 100% "), "%100\\%%");
        assert_eq!(like_pattern("gen_3"), "%gen\\_3%");
    }

    #[test]
    fn test_non_unique_errors_pass_through() {
        let err = map_unique_violation(sqlx::Error::RowNotFound, &[]);
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }
}
