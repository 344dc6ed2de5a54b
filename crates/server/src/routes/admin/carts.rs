//! Read-only view of every cart with its items inline.

use axum::{Json, Router, extract::State, routing::get};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use thinkpad_store_core::round_money;

use crate::db::CartRepository;
use crate::error::Result;
use crate::extract::ApiQuery;
use crate::middleware::RequireSuperuser;
use crate::models::{CartItem, CartOwner};
use crate::routes::cart::{CartItemResponse, current_rate};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/cart/", get(list_carts))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CartFilter {
    /// Case-insensitive substring of the owner's username or email.
    pub search: Option<String>,
}

/// A cart, its owner and its priced items.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminCartResponse {
    pub id: i32,
    /// Owner's user id.
    pub user: i32,
    pub username: String,
    pub email: String,
    pub items: Vec<CartItemResponse>,
    pub original_total_price: String,
    pub total_price: String,
}

impl AdminCartResponse {
    /// Render `owner` with the subset of `items` that belong to its cart.
    #[must_use]
    pub fn new(owner: &CartOwner, items: &[CartItem], rate: Decimal) -> Self {
        let own: Vec<&CartItem> = items.iter().filter(|item| item.cart_id == owner.id).collect();
        let original: Decimal = own.iter().map(|item| item.original_total_price()).sum();
        let total: Decimal = own.iter().map(|item| item.total_price(rate)).sum();

        Self {
            id: owner.id.as_i32(),
            user: owner.user_id.as_i32(),
            username: owner.username.to_string(),
            email: owner.email.as_str().to_owned(),
            items: own
                .iter()
                .map(|item| CartItemResponse::new(item, rate))
                .collect(),
            original_total_price: round_money(original).to_string(),
            total_price: round_money(total).to_string(),
        }
    }
}

/// List carts with their items.
#[utoipa::path(
    get,
    path = "/admin/cart/",
    tag = "admin",
    security(("bearer" = [])),
    params(CartFilter),
    responses(
        (status = 200, description = "Matching carts", body = [AdminCartResponse]),
        (status = 403, description = "Not a superuser"),
    )
)]
#[instrument(skip(state, _admin))]
pub async fn list_carts(
    State(state): State<AppState>,
    RequireSuperuser(_admin): RequireSuperuser,
    ApiQuery(filter): ApiQuery<CartFilter>,
) -> Result<Json<Vec<AdminCartResponse>>> {
    let search = filter.search.as_deref().filter(|s| !s.trim().is_empty());
    let carts = CartRepository::new(state.pool());

    let owners = carts.list_carts(search).await?;
    let ids: Vec<_> = owners.iter().map(|owner| owner.id).collect();
    let items = carts.items_for_carts(&ids).await?;
    let rate = current_rate(state.pool()).await?;

    Ok(Json(
        owners
            .iter()
            .map(|owner| AdminCartResponse::new(owner, &items, rate))
            .collect(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use thinkpad_store_core::{CartId, CartItemId, Email, Price, ProductId, UserId, Username};

    use super::*;

    fn item(id: i32, cart: i32, price: &str, quantity: i32) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            cart_id: CartId::new(cart),
            product_id: ProductId::new(id * 10),
            quantity,
            unit_price: Price::parse(price).unwrap(),
        }
    }

    #[test]
    fn test_cart_keeps_only_its_items() {
        let owner = CartOwner {
            id: CartId::new(2),
            user_id: UserId::new(5),
            username: Username::parse("buyer").unwrap(),
            email: Email::parse("buyer@example.com").unwrap(),
        };
        let items = [
            item(1, 1, "100.00", 1),
            item(2, 2, "1999.99", 2),
            item(3, 2, "10.00", 1),
        ];

        let response = AdminCartResponse::new(&owner, &items, Decimal::new(8, 1));
        assert_eq!(response.user, 5);
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.original_total_price, "4009.98");
        assert_eq!(response.total_price, "3207.98");
    }
}
