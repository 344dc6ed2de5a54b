//! Integration tests for the public catalogue and API docs.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (ts-cli migrate)
//! - The API server running (ts-cli runserver)
//! - A superuser (`STORE_ADMIN_USERNAME` / `STORE_ADMIN_PASSWORD`)
//!
//! Run with: cargo test -p thinkpad-store-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::Value;

use thinkpad_store_integration_tests::{Session, create_product, delete_product, url};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_product_list_and_detail() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "6999.00", 3).await;
    let id = product["id"].as_i64().unwrap();

    let resp = Client::new().get(url("/product/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Value = resp.json().await.unwrap();
    assert!(list.as_array().unwrap().iter().any(|p| p["id"] == id));

    let resp = Client::new()
        .get(url(&format!("/product/{id}/")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(detail["price"], "6999.00");
    assert!(
        detail["image"]
            .as_str()
            .unwrap()
            .ends_with("product_images/deleted_product.svg")
    );

    delete_product(&admin, id).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_unknown_product() {
    let resp = Client::new()
        .get(url("/product/2147483647/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "No Product matches the given query.");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_placeholder_image_is_served() {
    let resp = Client::new()
        .get(url("/media/product_images/deleted_product.svg"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_swagger() {
    let resp = Client::new().get(url("/swagger/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("swagger-ui"));

    let resp = Client::new().get(url("/swagger.json")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let doc: Value = resp.json().await.unwrap();
    assert!(doc["paths"]["/assistant/chat/"].is_object());
}
