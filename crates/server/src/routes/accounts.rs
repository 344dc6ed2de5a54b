//! Account routes: registration, JWT login/refresh and user listing.

use axum::{Json, Router, extract::State, http::StatusCode, routing::{get, post}};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use thinkpad_store_core::UserId;

use crate::db::UserRepository;
use crate::error::{AppError, Result, ValidationErrors};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{RequireAuth, auth_rate_limiter};
use crate::models::User;
use crate::services::auth::{AuthService, Registration, TokenPair};
use crate::state::AppState;

/// Build the account router.
///
/// Registration and login share a per-IP rate limiter.
pub fn routes() -> Router<AppState> {
    let credential_routes = Router::new()
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/login/token/", post(obtain_token_pair))
        .route("/login/token/refresh/", post(refresh_token))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(credential_routes)
        .route("/users/", get(list_users))
        .route("/users/{id}/", get(get_user))
}

// =============================================================================
// DTOs
// =============================================================================

/// Registration body. The password is write-only.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    /// At least 8 characters.
    #[schema(format = Password)]
    pub password: Option<String>,
}

/// Public view of an account.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.to_string(),
            email: user.email.as_str().to_owned(),
        }
    }
}

/// Username/password login body.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    #[schema(format = Password)]
    pub password: Option<String>,
}

/// Refresh token exchange body.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// A newly issued access token.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account (and its cart).
#[utoipa::path(
    post,
    path = "/register/",
    tag = "accounts",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Field errors"),
        (status = 429, description = "Throttled"),
    )
)]
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let registration = Registration::validate(
        body.username.as_deref(),
        body.email.as_deref(),
        body.password.as_deref(),
    )?;

    let user = AuthService::new(state.pool()).register(&registration).await?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Exchange credentials for a refresh/access token pair.
#[utoipa::path(
    post,
    path = "/login/",
    tag = "accounts",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "No active account found with the given credentials"),
    )
)]
#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<TokenPair>> {
    issue_pair(&state, &body).await.map(Json)
}

/// Same as `/login/`, under the conventional token path.
#[utoipa::path(
    post,
    path = "/login/token/",
    tag = "accounts",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 401, description = "No active account found with the given credentials"),
    )
)]
#[instrument(skip(state, body))]
pub async fn obtain_token_pair(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<TokenPair>> {
    issue_pair(&state, &body).await.map(Json)
}

async fn issue_pair(state: &AppState, body: &LoginRequest) -> Result<TokenPair> {
    let mut errors = ValidationErrors::new();
    let username = errors.require("username", body.username.as_deref());
    let password = errors.require("password", body.password.as_deref());
    let (Some(username), Some(password)) = (username, password) else {
        return Err(errors.into());
    };

    let user = AuthService::new(state.pool())
        .authenticate(username, password)
        .await
        .inspect_err(|_| tracing::info!(username, "Login rejected"))?;

    let pair = state.jwt().issue_pair(user.id)?;
    tracing::info!(user_id = %user.id, "Issued token pair");
    Ok(pair)
}

/// Exchange a refresh token for a new access token.
#[utoipa::path(
    post,
    path = "/login/token/refresh/",
    tag = "accounts",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Token is invalid or expired, or its account is inactive"),
    )
)]
#[instrument(skip(state, body))]
pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>> {
    let mut errors = ValidationErrors::new();
    let Some(refresh) = errors.require("refresh", body.refresh.as_deref()) else {
        return Err(errors.into());
    };

    let access = AuthService::new(state.pool())
        .refresh(state.jwt(), refresh)
        .await?;
    Ok(Json(AccessTokenResponse { access }))
}

/// List visible accounts: everyone for superusers, otherwise only yourself.
#[utoipa::path(
    get,
    path = "/users/",
    tag = "accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Visible accounts", body = [UserResponse]),
        (status = 401, description = "Not authenticated"),
    )
)]
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<UserResponse>>> {
    if !user.is_superuser {
        return Ok(Json(vec![UserResponse::from(&user)]));
    }

    let users = UserRepository::new(state.pool()).list(None).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// Show one visible account.
#[utoipa::path(
    get,
    path = "/users/{id}/",
    tag = "accounts",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "Account", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Unknown or hidden account"),
    )
)]
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_user(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<UserResponse>> {
    let id = UserId::new(id);
    if id == user.id {
        return Ok(Json(UserResponse::from(&user)));
    }
    if !user.is_superuser {
        return Err(AppError::not_found());
    }

    let other = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(AppError::not_found)?;
    Ok(Json(UserResponse::from(&other)))
}
