//! Read-only product catalogue.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use thinkpad_store_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::ApiPath;
use crate::models::Product;
use crate::services::media::MediaStore;
use crate::state::AppState;

/// Build the catalogue router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/product/", get(list_products))
        .route("/product/{id}/", get(get_product))
}

/// A product as rendered to clients, with image paths turned into URLs.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub model: String,
    /// Decimal string with two places, e.g. `"5999.00"`.
    pub price: String,
    pub description: String,
    pub stock: i32,
    /// Main image URL; the placeholder when the product has none.
    pub image: String,
    /// Additional image URLs.
    pub images: Vec<String>,
}

impl ProductResponse {
    #[must_use]
    pub fn new(product: &Product, media: &MediaStore) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            model: product.model.clone(),
            price: product.price.to_string(),
            description: product.description.clone(),
            stock: product.stock,
            image: media.url_for(&product.image),
            images: product.images.iter().map(|path| media.url_for(path)).collect(),
        }
    }
}

/// List every product, ordered by id.
#[utoipa::path(
    get,
    path = "/product/",
    tag = "catalog",
    responses((status = 200, description = "All products", body = [ProductResponse]))
)]
#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<ProductResponse>>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    let media = state.media();

    Ok(Json(
        products
            .iter()
            .map(|product| ProductResponse::new(product, media))
            .collect(),
    ))
}

/// Show one product.
#[utoipa::path(
    get,
    path = "/product/{id}/",
    tag = "catalog",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "The product", body = ProductResponse),
        (status = 404, description = "No Product matches the given query."),
    )
)]
#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ProductResponse>> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::no_match("Product"))?;

    Ok(Json(ProductResponse::new(&product, state.media())))
}
