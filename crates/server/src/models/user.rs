//! User domain types.

use chrono::{DateTime, Utc};

use thinkpad_store_core::{Email, UserId, Username};

/// A store account (domain type).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// Normalized email address.
    pub email: Email,
    /// Whether the user has VIP status.
    pub is_vip: bool,
    /// Whether the user may use the admin surface.
    pub is_superuser: bool,
    /// Inactive users cannot log in.
    pub is_active: bool,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
}

/// Partial update of the admin-controlled account flags.
///
/// `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFlags {
    pub is_vip: Option<bool>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

impl UserFlags {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.is_vip.is_none() && self.is_active.is_none() && self.is_superuser.is_none()
    }
}
