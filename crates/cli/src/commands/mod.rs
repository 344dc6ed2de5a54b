//! `ts-cli` subcommand implementations.

pub mod makemigration;
pub mod migrate;
pub mod runserver;
pub mod seed;
pub mod superuser;

use secrecy::SecretString;
use thiserror::Error;

/// Errors raised while reading command environment.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0} (or DATABASE_URL)")]
    MissingDatabaseUrl(&'static str),
}

/// Database URL from `STORE_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns `EnvError::MissingDatabaseUrl` if neither is set.
pub fn database_url() -> Result<SecretString, EnvError> {
    dotenvy::dotenv().ok();

    std::env::var("STORE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| EnvError::MissingDatabaseUrl("STORE_DATABASE_URL"))
}
