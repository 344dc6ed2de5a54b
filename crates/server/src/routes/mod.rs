//! HTTP route handlers for the store API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (database)
//!
//! # Accounts
//! POST /register/                  - Create an account
//! POST /login/                     - Obtain a token pair
//! POST /login/token/               - Obtain a token pair
//! POST /login/token/refresh/       - Exchange a refresh token
//! GET  /users/                     - Visible users (auth)
//! GET  /users/{id}/                - One visible user (auth)
//!
//! # Catalogue
//! GET  /product/                   - All products
//! GET  /product/{id}/              - One product
//!
//! # Cart (auth)
//! GET  /cart/                      - Items in your cart
//! POST /cart/                      - Add or merge an item
//! GET  /cart/summary/              - Cart totals
//! GET  /cart/{id}/                 - One item
//! PUT  /cart/{id}/                 - Replace an item
//! PATCH /cart/{id}/                - Update an item
//! DELETE /cart/{id}/               - Remove an item
//!
//! # Assistant
//! POST /assistant/chat/            - Catalogue-grounded recommendations
//!
//! # Admin (superuser)
//! GET/POST /admin/product/         - Search and create products (multipart)
//! GET/PUT/DELETE /admin/product/{id}/
//! GET/POST /admin/promotion/       - Search and create promotions
//! GET/PUT/DELETE /admin/promotion/{id}/
//! GET  /admin/user/                - Search users
//! GET/PATCH /admin/user/{id}/      - Show a user, toggle flags
//! GET  /admin/cart/                - Carts with their items
//!
//! # Docs
//! GET  /swagger/                   - Swagger UI
//! GET  /swagger.json               - OpenAPI document
//! ```

pub mod accounts;
pub mod admin;
pub mod assistant;
pub mod cart;
pub mod docs;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(accounts::routes())
        .merge(products::routes())
        .merge(cart::routes())
        .merge(assistant::routes())
        .nest("/admin", admin::routes())
        .merge(docs::routes())
}
