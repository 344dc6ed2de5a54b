//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Error bodies are JSON: either `{"detail": "..."}` or, for validation
//! failures, a map from field name to a list of messages.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::assistant::AssistantError;
use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field → messages map rendered as the body of a 400 response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A map holding one message for one field.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Pass a present value through, or record "This field is required.".
    pub fn require<'v, T: ?Sized>(&mut self, field: &str, value: Option<&'v T>) -> Option<&'v T> {
        if value.is_none() {
            self.add(field, "This field is required.");
        }
        value
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one message was recorded.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Shopping assistant failed.
    #[error("Assistant error: {0}")]
    Assistant(#[from] AssistantError),

    /// Request body or query failed validation.
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// Resource not found. Carries the client-facing detail.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authenticated, but not allowed.
    #[error("Forbidden")]
    Forbidden,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// 404 with the generic "Not found." detail.
    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound("Not found.".to_string())
    }

    /// 404 naming the kind of object that was looked up.
    #[must_use]
    pub fn no_match(kind: &str) -> Self {
        Self::NotFound(format!("No {kind} matches the given query."))
    }

    fn is_server_error(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Database(err) | Self::Auth(AuthError::Repository(err)) => {
                !matches!(err, RepositoryError::NotFound | RepositoryError::Conflict(_))
            }
            Self::Auth(AuthError::PasswordHash | AuthError::TokenEncoding(_)) => true,
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(
                AuthError::InvalidCredentials
                | AuthError::NotAuthenticated
                | AuthError::InvalidToken
                | AuthError::InactiveAccount,
            ) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> serde_json::Value {
        // Don't expose internal error details to clients
        if self.is_server_error() {
            return json!({ "detail": "Internal server error" });
        }
        match self {
            Self::Validation(errors) | Self::Auth(AuthError::Validation(errors)) => json!(errors),
            Self::Database(RepositoryError::NotFound) => json!({ "detail": "Not found." }),
            Self::Database(RepositoryError::Conflict(field)) => json!(ValidationErrors::single(
                field,
                "This value conflicts with an existing record."
            )),
            Self::Auth(AuthError::InvalidCredentials) => {
                json!({ "detail": "No active account found with the given credentials" })
            }
            Self::Auth(AuthError::NotAuthenticated) => {
                json!({ "detail": "Authentication credentials were not provided." })
            }
            Self::Auth(AuthError::InvalidToken) => json!({
                "detail": "Token is invalid or expired",
                "code": "token_not_valid",
            }),
            Self::Auth(AuthError::InactiveAccount) => json!({
                "detail": "No active account found for the given token.",
                "code": "no_active_account",
            }),
            Self::Assistant(err) => err.to_body(),
            Self::NotFound(detail) | Self::BadRequest(detail) => json!({ "detail": detail }),
            Self::Forbidden => {
                json!({ "detail": "You do not have permission to perform this action." })
            }
            Self::RateLimited => json!({ "detail": "Request was throttled." }),
            _ => json!({ "detail": self.to_string() }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("JSON parse error - {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        Self::not_found()
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(format!("Multipart form parse error - {}", err.body_text()))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}
