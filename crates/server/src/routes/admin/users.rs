//! User account management.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use thinkpad_store_core::UserId;

use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireSuperuser;
use crate::models::{User, UserFlags};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/", get(list_users))
        .route("/user/{id}/", get(get_user).patch(update_user))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    /// Case-insensitive substring of username or email.
    pub search: Option<String>,
}

/// A user with every admin-visible field.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_vip: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<&User> for AdminUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_i32(),
            username: user.username.to_string(),
            email: user.email.as_str().to_owned(),
            is_vip: user.is_vip,
            is_superuser: user.is_superuser,
            is_active: user.is_active,
            date_joined: user.date_joined,
        }
    }
}

/// Flags to change; omitted flags keep their value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserFlagsRequest {
    pub is_vip: Option<bool>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

impl From<UserFlagsRequest> for UserFlags {
    fn from(request: UserFlagsRequest) -> Self {
        Self {
            is_vip: request.is_vip,
            is_active: request.is_active,
            is_superuser: request.is_superuser,
        }
    }
}

/// Search users.
#[utoipa::path(
    get,
    path = "/admin/user/",
    tag = "admin",
    security(("bearer" = [])),
    params(UserFilter),
    responses(
        (status = 200, description = "Matching users", body = [AdminUserResponse]),
        (status = 403, description = "Not a superuser"),
    )
)]
#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireSuperuser(_admin): RequireSuperuser,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> Result<Json<Vec<AdminUserResponse>>> {
    let search = filter.search.as_deref().filter(|s| !s.trim().is_empty());
    let users = UserRepository::new(state.pool()).list(search).await?;

    Ok(Json(users.iter().map(AdminUserResponse::from).collect()))
}

/// Show one user.
#[utoipa::path(
    get,
    path = "/admin/user/{id}/",
    tag = "admin",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = AdminUserResponse),
        (status = 404, description = "Unknown user"),
    )
)]
#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    RequireSuperuser(_admin): RequireSuperuser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<AdminUserResponse>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(UserId::new(id))
        .await?
        .ok_or_else(|| AppError::no_match("User"))?;

    Ok(Json(AdminUserResponse::from(&user)))
}

/// Toggle VIP, active and superuser flags.
#[utoipa::path(
    patch,
    path = "/admin/user/{id}/",
    tag = "admin",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "User id")),
    request_body = UserFlagsRequest,
    responses(
        (status = 200, description = "Updated", body = AdminUserResponse),
        (status = 404, description = "Unknown user"),
    )
)]
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update_user(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<UserFlagsRequest>,
) -> Result<Json<AdminUserResponse>> {
    let id = UserId::new(id);
    let users = UserRepository::new(state.pool());
    let flags = UserFlags::from(body);

    let user = if flags.is_empty() {
        users.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    } else {
        users.update_flags(id, flags).await
    }
    .map_err(|e| match e {
        RepositoryError::NotFound => AppError::no_match("User"),
        other => other.into(),
    })?;

    tracing::info!(
        user_id = %user.id,
        is_vip = user.is_vip,
        is_active = user.is_active,
        is_superuser = user.is_superuser,
        "User flags updated"
    );
    Ok(Json(AdminUserResponse::from(&user)))
}
