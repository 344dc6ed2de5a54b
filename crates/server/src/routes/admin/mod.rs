//! Superuser-only management endpoints under `/admin`.
//!
//! Every handler takes [`RequireSuperuser`](crate::middleware::RequireSuperuser):
//! anonymous callers get 401, authenticated non-superusers 403.

pub mod carts;
pub mod products;
pub mod promotions;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the admin router (nested at `/admin`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(products::routes())
        .merge(promotions::routes())
        .merge(users::routes())
        .merge(carts::routes())
}
