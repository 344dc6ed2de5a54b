//! Per-user shopping cart.
//!
//! Every endpoint is scoped to the authenticated user's own cart; another
//! user's item ids behave as if they did not exist.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::instrument;
use utoipa::ToSchema;

use thinkpad_store_core::{CartId, CartItemId, ProductId, UserId, round_money};

use crate::db::{
    CartRepository, ProductRepository, PromotionRepository, RepositoryError, UserRepository,
};
use crate::error::{AppError, Result, ValidationErrors};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::CartItem;
use crate::services::pricing;
use crate::state::AppState;

/// Build the cart router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart/", get(list_items).post(add_item))
        .route("/cart/summary/", get(summary))
        .route(
            "/cart/{id}/",
            get(get_item)
                .put(replace_item)
                .patch(update_item)
                .delete(delete_item),
        )
}

// =============================================================================
// DTOs
// =============================================================================

/// Cart item body for create and update.
///
/// `product` is required on create and replace. `quantity` defaults to 1 on
/// create; updates that omit it keep the stored quantity.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CartItemRequest {
    /// Product id.
    #[schema(value_type = Option<i32>)]
    pub product: Option<Value>,
    /// At least 1.
    #[schema(value_type = Option<i32>, minimum = 1)]
    pub quantity: Option<Value>,
}

/// A cart line with its prices.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub id: i32,
    /// Owning cart id.
    pub cart: i32,
    /// Product id.
    pub product: i32,
    pub quantity: i32,
    /// `quantity × price` before promotions.
    pub original_total_price: String,
    /// Price after every active promotion.
    pub total_price: String,
}

impl CartItemResponse {
    /// Render an item priced with the combined promotion `rate`.
    #[must_use]
    pub fn new(item: &CartItem, rate: Decimal) -> Self {
        Self {
            id: item.id.as_i32(),
            cart: item.cart_id.as_i32(),
            product: item.product_id.as_i32(),
            quantity: item.quantity,
            original_total_price: item.original_total_price().to_string(),
            total_price: item.total_price(rate).to_string(),
        }
    }
}

/// Totals over the whole cart.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartSummaryResponse {
    /// Owner's username.
    pub user: String,
    /// Number of units across all lines.
    pub item_count: i64,
    pub original_total_price: String,
    pub total_price: String,
}

impl CartSummaryResponse {
    #[must_use]
    pub fn new(username: &str, items: &[CartItem], rate: Decimal) -> Self {
        let item_count = items.iter().map(|item| i64::from(item.quantity)).sum();
        let original: Decimal = items.iter().map(CartItem::original_total_price).sum();
        let total: Decimal = items.iter().map(|item| item.total_price(rate)).sum();

        Self {
            user: username.to_owned(),
            item_count,
            original_total_price: round_money(original).to_string(),
            total_price: round_money(total).to_string(),
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Which fields an item body must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Replace,
    Partial,
}

/// Validated (but not yet existence-checked) item fields.
#[derive(Debug, Default, PartialEq, Eq)]
struct ItemChanges {
    product: Option<i32>,
    quantity: Option<i32>,
}

impl CartItemRequest {
    fn validate(&self, mode: Mode) -> std::result::Result<ItemChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let product = match &self.product {
            None if mode == Mode::Partial => None,
            None => {
                errors.add("product", "This field is required.");
                None
            }
            Some(value) => parse_pk(value).map_err(|msg| errors.add("product", msg)).ok(),
        };

        let quantity = match &self.quantity {
            None => None,
            Some(value) => parse_quantity(value)
                .map_err(|msg| errors.add("quantity", msg))
                .ok(),
        };

        errors.into_result()?;
        Ok(ItemChanges { product, quantity })
    }
}

impl ItemChanges {
    /// Quantity to store on update; an omitted quantity keeps `current`.
    fn quantity_or(&self, current: i32) -> i32 {
        self.quantity.unwrap_or(current)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn parse_pk(value: &Value) -> std::result::Result<i32, String> {
    let parsed = match value {
        Value::Null => return Err("This field may not be null.".to_string()),
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(pk) => i32::try_from(pk).map_err(|_| does_not_exist(value)),
        None if value.is_string() => Err(does_not_exist(value)),
        None => Err(format!(
            "Incorrect type. Expected pk value, received {}.",
            json_type_name(value)
        )),
    }
}

fn does_not_exist(value: &Value) -> String {
    let pk = value.as_str().map_or_else(|| value.to_string(), str::to_owned);
    format!("Invalid pk \"{pk}\" - object does not exist.")
}

fn parse_quantity(value: &Value) -> std::result::Result<i32, String> {
    let parsed = match value {
        Value::Null => return Err("This field may not be null.".to_string()),
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        None => Err("A valid integer is required.".to_string()),
        Some(n) if n < 1 => Err("Ensure this value is greater than or equal to 1.".to_string()),
        Some(n) => i32::try_from(n)
            .map_err(|_| format!("Ensure this value is less than or equal to {}.", i32::MAX)),
    }
}

/// Check that a referenced product exists.
async fn existing_product(pool: &PgPool, pk: i32) -> Result<ProductId> {
    let id = ProductId::new(pk);
    if ProductRepository::new(pool).exists(id).await? {
        Ok(id)
    } else {
        Err(ValidationErrors::single(
            "product",
            format!("Invalid pk \"{pk}\" - object does not exist."),
        )
        .into())
    }
}

/// Combined multiplier of every promotion active right now.
pub(crate) async fn current_rate(pool: &PgPool) -> Result<Decimal> {
    let discounts = PromotionRepository::new(pool)
        .active_discounts(Utc::now())
        .await?;
    Ok(pricing::combined_rate(&discounts))
}

async fn cart_of(pool: &PgPool, user_id: UserId) -> Result<CartId> {
    Ok(UserRepository::new(pool).cart_id(user_id).await?)
}

fn no_such_item() -> AppError {
    AppError::no_match("CartItem")
}

// =============================================================================
// Handlers
// =============================================================================

/// List the items in your cart.
#[utoipa::path(
    get,
    path = "/cart/",
    tag = "cart",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Cart items", body = [CartItemResponse]),
        (status = 401, description = "Not authenticated"),
    )
)]
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_items(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<CartItemResponse>>> {
    let cart_id = cart_of(state.pool(), user.id).await?;
    let items = CartRepository::new(state.pool()).list_items(cart_id).await?;
    let rate = current_rate(state.pool()).await?;

    Ok(Json(
        items
            .iter()
            .map(|item| CartItemResponse::new(item, rate))
            .collect(),
    ))
}

/// Add a product, merging into an existing line for the same product.
#[utoipa::path(
    post,
    path = "/cart/",
    tag = "cart",
    security(("bearer" = [])),
    request_body = CartItemRequest,
    responses(
        (status = 201, description = "Created or merged item", body = CartItemResponse),
        (status = 400, description = "Field errors"),
        (status = 401, description = "Not authenticated"),
    )
)]
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CartItemRequest>,
) -> Result<(StatusCode, Json<CartItemResponse>)> {
    let changes = body.validate(Mode::Create)?;
    let product = match changes.product {
        Some(pk) => existing_product(state.pool(), pk).await?,
        None => return Err(ValidationErrors::single("product", "This field is required.").into()),
    };
    let quantity = changes.quantity.unwrap_or(1);

    let cart_id = cart_of(state.pool(), user.id).await?;
    let item = CartRepository::new(state.pool())
        .add_or_merge(cart_id, product, quantity)
        .await?;
    let rate = current_rate(state.pool()).await?;

    tracing::info!(item_id = %item.id, product_id = %product, quantity = item.quantity, "Cart item saved");
    Ok((StatusCode::CREATED, Json(CartItemResponse::new(&item, rate))))
}

/// Show one of your items.
#[utoipa::path(
    get,
    path = "/cart/{id}/",
    tag = "cart",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Cart item id")),
    responses(
        (status = 200, description = "The item", body = CartItemResponse),
        (status = 404, description = "Not in your cart"),
    )
)]
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<CartItemResponse>> {
    let cart_id = cart_of(state.pool(), user.id).await?;
    let item = CartRepository::new(state.pool())
        .get_item(cart_id, CartItemId::new(id))
        .await?
        .ok_or_else(no_such_item)?;
    let rate = current_rate(state.pool()).await?;

    Ok(Json(CartItemResponse::new(&item, rate)))
}

/// Replace an item's product and quantity.
#[utoipa::path(
    put,
    path = "/cart/{id}/",
    tag = "cart",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Cart item id")),
    request_body = CartItemRequest,
    responses(
        (status = 200, description = "Updated item", body = CartItemResponse),
        (status = 400, description = "Field errors"),
        (status = 404, description = "Not in your cart"),
    )
)]
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn replace_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<CartItemRequest>,
) -> Result<Json<CartItemResponse>> {
    save_item(&state, user.id, CartItemId::new(id), &body, Mode::Replace).await
}

/// Change some fields of an item.
#[utoipa::path(
    patch,
    path = "/cart/{id}/",
    tag = "cart",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Cart item id")),
    request_body = CartItemRequest,
    responses(
        (status = 200, description = "Updated item", body = CartItemResponse),
        (status = 400, description = "Field errors"),
        (status = 404, description = "Not in your cart"),
    )
)]
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<CartItemRequest>,
) -> Result<Json<CartItemResponse>> {
    save_item(&state, user.id, CartItemId::new(id), &body, Mode::Partial).await
}

async fn save_item(
    state: &AppState,
    user_id: UserId,
    item_id: CartItemId,
    body: &CartItemRequest,
    mode: Mode,
) -> Result<Json<CartItemResponse>> {
    let pool = state.pool();
    let cart_id = cart_of(pool, user_id).await?;
    let carts = CartRepository::new(pool);
    let existing = carts
        .get_item(cart_id, item_id)
        .await?
        .ok_or_else(no_such_item)?;

    let changes = body.validate(mode)?;
    let product = match changes.product {
        Some(pk) => existing_product(pool, pk).await?,
        None => existing.product_id,
    };
    let quantity = changes.quantity_or(existing.quantity);

    let item = carts.update_item(cart_id, item_id, product, quantity).await?;
    let rate = current_rate(pool).await?;

    tracing::info!(item_id = %item.id, product_id = %product, quantity, "Cart item updated");
    Ok(Json(CartItemResponse::new(&item, rate)))
}

/// Remove an item from your cart.
#[utoipa::path(
    delete,
    path = "/cart/{id}/",
    tag = "cart",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Cart item id")),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Not in your cart"),
    )
)]
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode> {
    let cart_id = cart_of(state.pool(), user.id).await?;
    CartRepository::new(state.pool())
        .delete_item(cart_id, CartItemId::new(id))
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => no_such_item(),
            other => other.into(),
        })?;

    tracing::info!(item_id = id, "Cart item removed");
    Ok(StatusCode::NO_CONTENT)
}

/// Totals over your whole cart.
#[utoipa::path(
    get,
    path = "/cart/summary/",
    tag = "cart",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Cart totals", body = CartSummaryResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn summary(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartSummaryResponse>> {
    let cart_id = cart_of(state.pool(), user.id).await?;
    let items = CartRepository::new(state.pool()).list_items(cart_id).await?;
    let rate = current_rate(state.pool()).await?;

    Ok(Json(CartSummaryResponse::new(
        user.username.as_str(),
        &items,
        rate,
    )))
}
