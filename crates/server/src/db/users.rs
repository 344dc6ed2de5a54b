//! User repository for database operations.
//!
//! Every user owns exactly one cart; [`UserRepository::create_with_cart`]
//! inserts both in one transaction.

use sqlx::PgPool;
use tracing::instrument;

use thinkpad_store_core::{CartId, Email, UserId, Username};

use super::{RepositoryError, like_pattern, map_unique_violation};
use crate::models::{User, UserFlags};

const USER_COLUMNS: &str =
    "id, username, email, is_vip, is_superuser, is_active, date_joined";

const UNIQUE_CONSTRAINTS: &[(&str, &str)] = &[
    ("user_username_key", "username"),
    ("user_email_key", "email"),
];

/// Fields needed to create an account.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub username: &'a Username,
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub is_superuser: bool,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a user and their cart atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("username" | "email")` if either is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, new_user), fields(username = %new_user.username))]
    pub async fn create_with_cart(&self, new_user: NewUser<'_>) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let user: User = sqlx::query_as(&format!(
            r"
            INSERT INTO store.user (username, email, password_hash, is_superuser)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(new_user.is_superuser)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, UNIQUE_CONSTRAINTS))?;

        sqlx::query("INSERT INTO store.cart (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, "Created user with cart");
        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM store.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user and their password hash by username, for login.
    ///
    /// The lookup takes the raw submitted string; unknown and malformed
    /// usernames both yield `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            user: User,
            password_hash: String,
        }

        let row: Option<Row> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM store.user WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// List users ordered by ID, optionally filtered by a case-insensitive
    /// substring of username or email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as(&format!(
            r"
            SELECT {USER_COLUMNS}
            FROM store.user
            WHERE $1::text IS NULL OR username ILIKE $1 OR email ILIKE $1
            ORDER BY id
            "
        ))
        .bind(search.map(like_pattern))
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Update admin-controlled flags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn update_flags(&self, id: UserId, flags: UserFlags) -> Result<User, RepositoryError> {
        sqlx::query_as(&format!(
            r"
            UPDATE store.user
            SET is_vip = COALESCE($2, is_vip),
                is_active = COALESCE($3, is_active),
                is_superuser = COALESCE($4, is_superuser)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(flags.is_vip)
        .bind(flags.is_active)
        .bind(flags.is_superuser)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Get the ID of a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the user has no cart.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cart_id(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        let cart: Option<(CartId,)> =
            sqlx::query_as("SELECT id FROM store.cart WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        cart.map(|(id,)| id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("user {user_id} has no cart"))
        })
    }
}
