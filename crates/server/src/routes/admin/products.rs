//! Product management with image uploads.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use thinkpad_store_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery};
use crate::middleware::RequireSuperuser;
use crate::models::{ProductDraft, ProductInput};
use crate::routes::products::ProductResponse;
use crate::services::media::is_image;
use crate::state::AppState;

/// Largest accepted upload body.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/product/", get(list_products).post(create_product))
        .route(
            "/product/{id}/",
            get(get_product).put(update_product).delete(delete_product),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Filters for the product list.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Case-insensitive substring of name or model.
    pub search: Option<String>,
    /// Exact model.
    pub model: Option<String>,
}

/// Multipart form for creating or replacing a product.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ProductForm {
    pub name: String,
    pub model: String,
    /// Decimal, at most 10 digits with 2 decimal places.
    pub price: String,
    pub description: Option<String>,
    pub stock: i32,
    /// Image file; the previous file is deleted when replaced.
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

/// An uploaded image file.
struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// Read the product form fields and optional image out of a multipart body.
async fn read_form(mut multipart: Multipart) -> Result<(ProductDraft, Option<Upload>)> {
    let mut draft = ProductDraft::default();
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    upload = Some(Upload { file_name, bytes });
                }
            }
            "name" => draft.name = Some(field.text().await?),
            "model" => draft.model = Some(field.text().await?),
            "price" => draft.price = Some(field.text().await?),
            "description" => draft.description = Some(field.text().await?),
            "stock" => draft.stock = Some(field.text().await?),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok((draft, upload))
}

/// Validate the form, including the image bytes.
fn validate_form(draft: &ProductDraft, upload: Option<&Upload>) -> Result<ProductInput> {
    let input = ProductInput::validate(draft);
    let image_ok = upload.is_none_or(|upload| is_image(&upload.bytes));

    match (input, image_ok) {
        (Ok(input), true) => Ok(input),
        (result, image_ok) => {
            let mut errors = result.err().unwrap_or_default();
            if !image_ok {
                errors.add(
                    "image",
                    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
                );
            }
            Err(errors.into())
        }
    }
}

/// Search products.
#[utoipa::path(
    get,
    path = "/admin/product/",
    tag = "admin",
    security(("bearer" = [])),
    params(ProductFilter),
    responses(
        (status = 200, description = "Matching products", body = [ProductResponse]),
        (status = 403, description = "Not a superuser"),
    )
)]
#[instrument(skip(state, _admin))]
pub async fn list_products(
    State(state): State<AppState>,
    RequireSuperuser(_admin): RequireSuperuser,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<Json<Vec<ProductResponse>>> {
    let search = filter.search.as_deref().filter(|s| !s.trim().is_empty());
    let model = filter.model.as_deref().filter(|m| !m.is_empty());

    let products = ProductRepository::new(state.pool()).search(search, model).await?;
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
    path = "/admin/product/{id}/",
    tag = "admin",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "The product", body = ProductResponse),
        (status = 404, description = "Unknown product"),
    )
)]
#[instrument(skip(state, _admin))]
pub async fn get_product(
    State(state): State<AppState>,
    RequireSuperuser(_admin): RequireSuperuser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ProductResponse>> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::no_match("Product"))?;

    Ok(Json(ProductResponse::new(&product, state.media())))
}

/// Create a product from a multipart form.
#[utoipa::path(
    post,
    path = "/admin/product/",
    tag = "admin",
    security(("bearer" = [])),
    request_body(content = ProductForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Created", body = ProductResponse),
        (status = 400, description = "Field errors"),
        (status = 403, description = "Not a superuser"),
    )
)]
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let (draft, upload) = read_form(multipart?).await?;
    let input = validate_form(&draft, upload.as_ref())?;

    let media = state.media();
    let image = match &upload {
        Some(upload) => media
            .save_product_image(&upload.file_name, &upload.bytes)
            .await
            .map_err(|e| AppError::Internal(format!("failed to store image: {e}")))?,
        None => String::new(),
    };

    let product = match ProductRepository::new(state.pool()).create(&input, &image).await {
        Ok(product) => product,
        Err(e) => {
            media.purge(&image).await;
            return Err(e.into());
        }
    };

    tracing::info!(product_id = %product.id, "Product created");
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::new(&product, media)),
    ))
}

/// Replace a product's fields, and its image when one is uploaded.
#[utoipa::path(
    put,
    path = "/admin/product/{id}/",
    tag = "admin",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Product id")),
    request_body(content = ProductForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated", body = ProductResponse),
        (status = 400, description = "Field errors"),
        (status = 404, description = "Unknown product"),
    )
)]
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    ApiPath(id): ApiPath<i32>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ProductResponse>> {
    let id = ProductId::new(id);
    let products = ProductRepository::new(state.pool());
    let existing = products
        .get(id)
        .await?
        .ok_or_else(|| AppError::no_match("Product"))?;

    let (draft, upload) = read_form(multipart?).await?;
    let input = validate_form(&draft, upload.as_ref())?;

    let media = state.media();
    let new_image = match &upload {
        Some(upload) => Some(
            media
                .save_product_image(&upload.file_name, &upload.bytes)
                .await
                .map_err(|e| AppError::Internal(format!("failed to store image: {e}")))?,
        ),
        None => None,
    };

    let product = match products.update(id, &input, new_image.as_deref()).await {
        Ok(product) => product,
        Err(e) => {
            if let Some(image) = &new_image {
                media.purge(image).await;
            }
            return Err(e.into());
        }
    };

    if new_image.is_some() && existing.image != product.image {
        media.purge(&existing.image).await;
    }

    tracing::info!(product_id = %product.id, replaced_image = new_image.is_some(), "Product updated");
    Ok(Json(ProductResponse::new(&product, media)))
}

/// Delete a product and its image files.
#[utoipa::path(
    delete,
    path = "/admin/product/{id}/",
    tag = "admin",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown product"),
    )
)]
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode> {
    let product = ProductRepository::new(state.pool())
        .delete(ProductId::new(id))
        .await?;

    let media = state.media();
    media.purge(&product.image).await;
    for image in &product.images {
        media.purge(image).await;
    }

    tracing::info!(product_id = %product.id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
