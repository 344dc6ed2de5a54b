//! OpenAPI document for the whole API, served at `/swagger.json`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::assistant::{ChatReply, ChatRequest, Recommendation, UsedFilters};
use crate::assistant::types::{HistoryMessage, Role};
use crate::routes::{accounts, admin, assistant, cart, products};
use crate::services::auth::TokenPair;

/// Name of the JWT bearer scheme referenced by `security(("bearer" = []))`.
pub const BEARER_SCHEME: &str = "bearer";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ThinkPad Store API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Catalogue, cart, promotions, administration and shopping assistant for the ThinkPad Store",
    ),
    paths(
        accounts::register,
        accounts::login,
        accounts::obtain_token_pair,
        accounts::refresh_token,
        accounts::list_users,
        accounts::get_user,
        products::list_products,
        products::get_product,
        cart::list_items,
        cart::add_item,
        cart::summary,
        cart::get_item,
        cart::replace_item,
        cart::update_item,
        cart::delete_item,
        assistant::chat,
        admin::products::list_products,
        admin::products::get_product,
        admin::products::create_product,
        admin::products::update_product,
        admin::products::delete_product,
        admin::promotions::list_promotions,
        admin::promotions::get_promotion,
        admin::promotions::create_promotion,
        admin::promotions::update_promotion,
        admin::promotions::delete_promotion,
        admin::users::list_users,
        admin::users::get_user,
        admin::users::update_user,
        admin::carts::list_carts,
    ),
    components(schemas(
        accounts::RegisterRequest,
        accounts::UserResponse,
        accounts::LoginRequest,
        accounts::RefreshRequest,
        accounts::AccessTokenResponse,
        TokenPair,
        products::ProductResponse,
        cart::CartItemRequest,
        cart::CartItemResponse,
        cart::CartSummaryResponse,
        ChatRequest,
        ChatReply,
        Recommendation,
        UsedFilters,
        HistoryMessage,
        Role,
        admin::products::ProductForm,
        admin::promotions::PromotionRequest,
        admin::promotions::PromotionResponse,
        admin::users::AdminUserResponse,
        admin::users::UserFlagsRequest,
        admin::carts::AdminCartResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "accounts", description = "Registration, login and JWT tokens"),
        (name = "catalog", description = "Read-only product catalogue"),
        (name = "cart", description = "The authenticated user's cart"),
        (name = "assistant", description = "Catalogue-grounded shopping assistant"),
        (name = "admin", description = "Superuser management"),
    )
)]
pub struct ApiDoc;

/// Registers the JWT bearer security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
