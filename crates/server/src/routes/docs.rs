//! Interactive API documentation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Path the generated OpenAPI document is served from.
pub const OPENAPI_JSON_PATH: &str = "/swagger.json";

const SWAGGER_UI_VERSION: &str = "5.17.14";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/swagger/", get(swagger_ui))
        .route(OPENAPI_JSON_PATH, get(openapi_json))
}

/// Swagger UI page template.
#[derive(Template, WebTemplate)]
#[template(path = "swagger.html")]
pub struct SwaggerTemplate {
    pub title: &'static str,
    pub ui_version: &'static str,
    pub spec_url: &'static str,
}

/// Display Swagger UI for the API.
pub async fn swagger_ui() -> SwaggerTemplate {
    SwaggerTemplate {
        title: "ThinkPad Store API",
        ui_version: SWAGGER_UI_VERSION,
        spec_url: OPENAPI_JSON_PATH,
    }
}

/// The OpenAPI 3 document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_swagger_page_points_at_document() {
        let html = SwaggerTemplate {
            title: "ThinkPad Store API",
            ui_version: SWAGGER_UI_VERSION,
            spec_url: OPENAPI_JSON_PATH,
        }
        .render()
        .unwrap();

        assert!(html.contains(r#"url: "/swagger.json""#));
        assert!(html.contains("swagger-ui-dist@5.17.14"));
        assert!(html.contains("<title>ThinkPad Store API - Swagger UI</title>"));
    }
}
