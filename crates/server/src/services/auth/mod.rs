//! Authentication service.
//!
//! Password registration and login, plus JWT issuance in [`jwt`].

mod error;
pub mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, JwtIssuer, TokenPair, TokenType};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use thinkpad_store_core::{Email, Username};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::error::ValidationErrors;
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Validated registration input.
#[derive(Debug)]
pub struct Registration {
    pub username: Username,
    pub email: Email,
    pub password: String,
}

impl Registration {
    /// Validate raw registration fields, collecting every problem by field.
    ///
    /// # Errors
    ///
    /// Returns the field → messages map when any field is missing or invalid.
    pub fn validate(
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let username = errors.require("username", username).and_then(|raw| {
            Username::parse(raw)
                .map_err(|e| errors.add("username", e.to_string()))
                .ok()
        });
        let email = errors.require("email", email).and_then(|raw| {
            Email::parse(raw)
                .map_err(|e| errors.add("email", e.to_string()))
                .ok()
        });
        let password = errors.require("password", password).and_then(|raw| {
            validate_password(raw)
                .map_err(|msg| errors.add("password", msg))
                .ok()
                .map(|()| raw.to_owned())
        });

        match (username, email, password) {
            (Some(username), Some(email), Some(password)) if errors.is_empty() => Ok(Self {
                username,
                email,
                password,
            }),
            _ => Err(errors),
        }
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user (with cart).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the username or email is taken.
    /// Returns `AuthError::PasswordHash` if hashing fails.
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        self.create_user(registration, false).await
    }

    /// Register a superuser (with cart).
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    pub async fn create_superuser(&self, registration: &Registration) -> Result<User, AuthError> {
        self.create_user(registration, true).await
    }

    async fn create_user(
        &self,
        registration: &Registration,
        is_superuser: bool,
    ) -> Result<User, AuthError> {
        let password_hash = hash_password(&registration.password)?;

        self.users
            .create_with_cart(NewUser {
                username: &registration.username,
                email: &registration.email,
                password_hash: &password_hash,
                is_superuser,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(field) => {
                    let message = if field == "email" {
                        "user with this email already exists.".to_string()
                    } else {
                        format!("A user with that {field} already exists.")
                    };
                    AuthError::Validation(ValidationErrors::single(&field, message))
                }
                other => AuthError::Repository(other),
            })
    }

    /// Check a username/password pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the user is unknown,
    /// inactive, or the password is wrong.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let (user, password_hash) = self
            .users
            .get_with_password_hash(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the refresh token is invalid.
    /// Returns `AuthError::InactiveAccount` if its user is gone or inactive.
    pub async fn refresh(&self, jwt: &JwtIssuer, refresh_token: &str) -> Result<String, AuthError> {
        let claims = jwt.verify(refresh_token, TokenType::Refresh)?;
        let user = active_account(self.users.get_by_id(claims.user_id()).await?)?;
        jwt.issue(user.id, TokenType::Access)
    }
}

/// The user a refresh token may still act for.
fn active_account(user: Option<User>) -> Result<User, AuthError> {
    user.filter(|user| user.is_active)
        .ok_or(AuthError::InactiveAccount)
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns a user-facing message when the password is too short or blank.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.trim().is_empty() {
        return Err("This field may not be blank.".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Ensure this field has at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("trackpoint-red").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("trackpoint-red", &hash).is_ok());
        assert!(matches!(
            verify_password("trackpoint-blue", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_refresh_requires_active_account() {
        let user = User {
            id: thinkpad_store_core::UserId::new(3),
            username: Username::parse("carbon").unwrap(),
            email: Email::parse("carbon@example.com").unwrap(),
            is_vip: false,
            is_superuser: false,
            is_active: true,
            date_joined: chrono::Utc::now(),
        };
        assert!(active_account(Some(user.clone())).is_ok());

        let inactive = User { is_active: false, ..user };
        assert!(matches!(active_account(Some(inactive)), Err(AuthError::InactiveAccount)));
        assert!(matches!(active_account(None), Err(AuthError::InactiveAccount)));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("        ").is_err());
    }

    #[test]
    fn test_registration_valid() {
        let reg = Registration::validate(
            Some("x1fan"),
            Some("Fan@Example.com"),
            Some("carbon-fiber"),
        )
        .unwrap();
        assert_eq!(reg.username.as_str(), "x1fan");
        assert_eq!(reg.email.as_str(), "Fan@example.com");
    }

    #[test]
    fn test_registration_collects_all_field_errors() {
        let errors = Registration::validate(None, Some("nope"), Some("short")).unwrap_err();
        let json = serde_json::to_value(&errors).unwrap();

        assert_eq!(json["username"][0], "This field is required.");
        assert_eq!(json["email"][0], "Enter a valid email address.");
        assert_eq!(
            json["password"][0],
            "Ensure this field has at least 8 characters."
        );
    }
}
