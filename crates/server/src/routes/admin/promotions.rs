//! Promotion management.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use thinkpad_store_core::{Discount, PromotionId};

use crate::db::{PromotionRepository, RepositoryError};
use crate::error::{AppError, Result, ValidationErrors};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireSuperuser;
use crate::models::{Promotion, PromotionInput};
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 255;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/promotion/", get(list_promotions).post(create_promotion))
        .route(
            "/promotion/{id}/",
            get(get_promotion)
                .put(update_promotion)
                .delete(delete_promotion),
        )
}

/// Filters for the promotion list.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PromotionFilter {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    /// Only promotions that are (or are not) active now.
    pub active: Option<bool>,
}

/// Promotion fields as submitted.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PromotionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Defaults to now on create; kept on update.
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Discount level 0..=10; the price multiplier is `discount / 10`.
    pub discount: Option<i64>,
}

impl PromotionRequest {
    /// Validate against the start date the promotion will end up with.
    fn validate(self, effective_start: DateTime<Utc>) -> std::result::Result<PromotionInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = match self.name.as_deref().map(str::trim) {
            None => {
                errors.add("name", "This field is required.");
                None
            }
            Some("") => {
                errors.add("name", "This field may not be blank.");
                None
            }
            Some(name) if name.chars().count() > MAX_NAME_CHARS => {
                errors.add(
                    "name",
                    format!("Ensure this field has no more than {MAX_NAME_CHARS} characters."),
                );
                None
            }
            Some(name) => Some(name.to_owned()),
        };

        let end_date = errors.require("end_date", self.end_date.as_ref()).copied();

        let discount = match self.discount {
            None => {
                errors.add("discount", "This field is required.");
                None
            }
            Some(level) => match i16::try_from(level)
                .ok()
                .and_then(|level| Discount::new(level).ok())
            {
                Some(discount) => Some(discount),
                None => {
                    errors.add(
                        "discount",
                        format!(
                            "Ensure this value is between {} and {} (got {level}).",
                            Discount::MIN,
                            Discount::MAX
                        ),
                    );
                    None
                }
            },
        };

        let start = self.start_date.unwrap_or(effective_start);
        if let Some(end) = end_date
            && end < start
        {
            errors.add("end_date", "End date must not be earlier than start date.");
        }

        match (name, end_date, discount) {
            (Some(name), Some(end_date), Some(discount)) if errors.is_empty() => Ok(PromotionInput {
                name,
                description: self.description.unwrap_or_default(),
                start_date: self.start_date,
                end_date,
                discount,
            }),
            _ => Err(errors),
        }
    }
}

/// A promotion as rendered to admins.
#[derive(Debug, Serialize, ToSchema)]
pub struct PromotionResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub discount: i16,
    /// Whether the promotion applies right now.
    pub is_active: bool,
}

impl PromotionResponse {
    #[must_use]
    pub fn new(promotion: &Promotion, now: DateTime<Utc>) -> Self {
        Self {
            id: promotion.id.as_i32(),
            name: promotion.name.clone(),
            description: promotion.description.clone(),
            start_date: promotion.start_date,
            end_date: promotion.end_date,
            discount: promotion.discount.level(),
            is_active: promotion.is_active_at(now),
        }
    }
}

/// List promotions.
#[utoipa::path(
    get,
    path = "/admin/promotion/",
    tag = "admin",
    security(("bearer" = [])),
    params(PromotionFilter),
    responses(
        (status = 200, description = "Matching promotions", body = [PromotionResponse]),
        (status = 403, description = "Not a superuser"),
    )
)]
#[instrument(skip(state, _admin))]
pub async fn list_promotions(
    State(state): State<AppState>,
    RequireSuperuser(_admin): RequireSuperuser,
    ApiQuery(filter): ApiQuery<PromotionFilter>,
) -> Result<Json<Vec<PromotionResponse>>> {
    let now = Utc::now();
    let search = filter.search.as_deref().filter(|s| !s.trim().is_empty());
    let promotions = PromotionRepository::new(state.pool())
        .list(search, filter.active, now)
        .await?;

    Ok(Json(
        promotions
            .iter()
            .map(|promotion| PromotionResponse::new(promotion, now))
            .collect(),
    ))
}

/// Show one promotion.
#[utoipa::path(
    get,
    path = "/admin/promotion/{id}/",
    tag = "admin",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Promotion id")),
    responses(
        (status = 200, description = "The promotion", body = PromotionResponse),
        (status = 404, description = "Unknown promotion"),
    )
)]
#[instrument(skip(state, _admin))]
pub async fn get_promotion(
    State(state): State<AppState>,
    RequireSuperuser(_admin): RequireSuperuser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<PromotionResponse>> {
    let promotion = PromotionRepository::new(state.pool())
        .get(PromotionId::new(id))
        .await?
        .ok_or_else(|| AppError::no_match("Promotion"))?;

    Ok(Json(PromotionResponse::new(&promotion, Utc::now())))
}

/// Create a promotion.
#[utoipa::path(
    post,
    path = "/admin/promotion/",
    tag = "admin",
    security(("bearer" = [])),
    request_body = PromotionRequest,
    responses(
        (status = 201, description = "Created", body = PromotionResponse),
        (status = 400, description = "Field errors"),
    )
)]
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn create_promotion(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    ApiJson(body): ApiJson<PromotionRequest>,
) -> Result<(StatusCode, Json<PromotionResponse>)> {
    let now = Utc::now();
    let input = body.validate(now)?;
    let promotion = PromotionRepository::new(state.pool()).create(&input).await?;

    Ok((
        StatusCode::CREATED,
        Json(PromotionResponse::new(&promotion, now)),
    ))
}

/// Replace a promotion. An omitted `start_date` keeps the stored one.
#[utoipa::path(
    put,
    path = "/admin/promotion/{id}/",
    tag = "admin",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Promotion id")),
    request_body = PromotionRequest,
    responses(
        (status = 200, description = "Updated", body = PromotionResponse),
        (status = 400, description = "Field errors"),
        (status = 404, description = "Unknown promotion"),
    )
)]
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update_promotion(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<PromotionRequest>,
) -> Result<Json<PromotionResponse>> {
    let id = PromotionId::new(id);
    let promotions = PromotionRepository::new(state.pool());
    let existing = promotions
        .get(id)
        .await?
        .ok_or_else(|| AppError::no_match("Promotion"))?;

    let input = body.validate(existing.start_date)?;
    let promotion = promotions.update(id, &input).await?;

    Ok(Json(PromotionResponse::new(&promotion, Utc::now())))
}

/// Delete a promotion.
#[utoipa::path(
    delete,
    path = "/admin/promotion/{id}/",
    tag = "admin",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Promotion id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown promotion"),
    )
)]
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_promotion(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode> {
    PromotionRepository::new(state.pool())
        .delete(PromotionId::new(id))
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::no_match("Promotion"),
            other => other.into(),
        })?;

    Ok(StatusCode::NO_CONTENT)
}
