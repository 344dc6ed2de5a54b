//! Create a superuser account.
//!
//! # Usage
//!
//! ```bash
//! ts-cli createsuperuser -u admin -e admin@example.com -p 'a long password'
//! ```

use thiserror::Error;

use thinkpad_store_server::db;
use thinkpad_store_server::error::ValidationErrors;
use thinkpad_store_server::services::auth::{AuthError, AuthService, Registration};

use super::{EnvError, database_url};

#[derive(Debug, Error)]
pub enum SuperuserError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("Invalid account details: {0}")]
    Invalid(ValidationErrors),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not create superuser: {0}")]
    Auth(AuthError),
}

impl From<AuthError> for SuperuserError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => Self::Invalid(errors),
            other => Self::Auth(other),
        }
    }
}

/// Create a superuser (and their cart). Returns the new user's id.
///
/// # Errors
///
/// Returns `SuperuserError` if the details are invalid, the username or email
/// is taken, or the database is unreachable.
pub async fn create(username: &str, email: &str, password: &str) -> Result<i32, SuperuserError> {
    let registration = Registration::validate(Some(username), Some(email), Some(password))
        .map_err(SuperuserError::Invalid)?;

    let database_url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    let user = AuthService::new(&pool)
        .create_superuser(&registration)
        .await?;

    tracing::info!(
        "Superuser created successfully! ID: {}, Username: {}, Email: {}",
        user.id,
        user.username,
        user.email.as_str()
    );
    Ok(user.id.as_i32())
}
