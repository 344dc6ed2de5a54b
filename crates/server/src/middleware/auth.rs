//! Authentication extractors.
//!
//! Requests authenticate with `Authorization: Bearer <access token>`. A
//! present but invalid token is always rejected, even on endpoints that allow
//! anonymous access.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::auth::{AuthError, TokenType};
use crate::state::AppState;

/// Extractor that requires an authenticated, active user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await?
            .map(Self)
            .ok_or(AppError::Auth(AuthError::NotAuthenticated))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, a missing `Authorization` header is not an error.
pub struct OptionalAuth(pub Option<User>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

/// Extractor that requires an authenticated superuser.
///
/// Anonymous requests get 401; authenticated non-superusers get 403.
pub struct RequireSuperuser(pub User);

impl FromRequestParts<AppState> for RequireSuperuser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_superuser {
            tracing::warn!(user_id = %user.id, "Non-superuser denied admin access");
            return Err(AppError::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Resolve the bearer token on a request to an active user.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };

    let claims = state.jwt().verify(token, TokenType::Access)?;
    let user = UserRepository::new(state.pool())
        .get_by_id(claims.user_id())
        .await?
        .filter(|user| user.is_active)
        .ok_or(AuthError::InvalidToken)?;

    set_sentry_user(&user.id, Some(user.username.as_str()));
    Ok(Some(user))
}

/// Extract the token from an `Authorization: Bearer` header.
///
/// No header means anonymous; any other scheme or a malformed header is an
/// invalid token.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AuthError::InvalidToken)?;
    let mut words = value.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
            Ok(Some(token))
        }
        _ => Err(AuthError::InvalidToken),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/cart/");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts(None)).unwrap(), None);
        assert_eq!(
            bearer_token(&parts(Some("Bearer abc.def.ghi"))).unwrap(),
            Some("abc.def.ghi")
        );
        assert_eq!(
            bearer_token(&parts(Some("bearer   abc"))).unwrap(),
            Some("abc")
        );
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert!(matches!(
            bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            bearer_token(&parts(Some("Bearer"))),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            bearer_token(&parts(Some("Bearer a b"))),
            Err(AuthError::InvalidToken)
        ));
    }
}
