//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::error::ValidationErrors;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, inactive account or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No bearer token on a request that needs one.
    #[error("authentication credentials were not provided")]
    NotAuthenticated,

    /// Token failed signature, expiry or type checks.
    #[error("token is invalid or expired")]
    InvalidToken,

    /// A valid refresh token names a deleted or deactivated user.
    #[error("no active account for token")]
    InactiveAccount,

    /// Registration input was rejected, keyed by field.
    #[error("invalid registration: {0}")]
    Validation(ValidationErrors),

    /// Token could not be signed.
    #[error("token encoding error: {0}")]
    TokenEncoding(#[from] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
