//! Integration tests for the superuser admin surface.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (ts-cli migrate)
//! - The API server running (ts-cli runserver)
//! - A superuser (`STORE_ADMIN_USERNAME` / `STORE_ADMIN_PASSWORD`)
//!
//! Run with: cargo test -p thinkpad-store-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::{StatusCode, multipart};
use serde_json::{Value, json};

use thinkpad_store_integration_tests::{
    Session, TINY_PNG, create_product, delete_product, unique, url,
};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_regular_users_are_forbidden() {
    let user = Session::register().await;
    for path in ["/admin/product/", "/admin/promotion/", "/admin/user/", "/admin/cart/"] {
        let resp = user
            .auth(user.client.get(url(path)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_product_image_upload_and_replace() {
    let admin = Session::admin().await;
    let name = unique("ThinkPad Z13");

    let form = multipart::Form::new()
        .text("name", name.clone())
        .text("model", "Gen 2")
        .text("price", "10999")
        .text("stock", "4")
        .part(
            "image",
            multipart::Part::bytes(TINY_PNG.to_vec()).file_name("z13.png"),
        );
    let resp = admin
        .auth(admin.client.post(url("/admin/product/")))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product: Value = resp.json().await.unwrap();
    let id = product["id"].as_i64().unwrap();
    let first_image = product["image"].as_str().unwrap().to_owned();
    assert!(first_image.contains("product_images/z13_"));

    let resp = admin.client.get(url(&first_image)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let form = multipart::Form::new()
        .text("name", name)
        .text("model", "Gen 2")
        .text("price", "9999")
        .text("stock", "4")
        .part(
            "image",
            multipart::Part::bytes(TINY_PNG.to_vec()).file_name("z13-new.png"),
        );
    let resp = admin
        .auth(admin.client.put(url(&format!("/admin/product/{id}/"))))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["price"], "9999.00");
    assert_ne!(updated["image"].as_str().unwrap(), first_image);

    // The replaced file is gone from disk
    let resp = admin.client.get(url(&first_image)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = admin
        .auth(admin.client.delete(url(&format!("/admin/product/{id}/"))))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_product_rejects_non_image() {
    let admin = Session::admin().await;
    let form = multipart::Form::new()
        .text("name", unique("ThinkPad"))
        .text("model", "Gen 1")
        .text("price", "1")
        .text("stock", "1")
        .part(
            "image",
            multipart::Part::bytes(b"not an image".to_vec()).file_name("notes.png"),
        );
    let resp = admin
        .auth(admin.client.post(url("/admin/product/")))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["image"].is_array());
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_promotion_lifecycle() {
    let admin = Session::admin().await;

    let resp = admin
        .auth(admin.client.post(url("/admin/promotion/")))
        .json(&json!({
            "name": unique("Future sale"),
            "start_date": "2099-01-01T00:00:00Z",
            "end_date": "2099-01-31T00:00:00Z",
            "discount": 8,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let promotion: Value = resp.json().await.unwrap();
    assert_eq!(promotion["is_active"], false);
    let promotion_url = url(&format!("/admin/promotion/{}/", promotion["id"]));

    let resp = admin
        .auth(admin.client.get(url("/admin/promotion/?active=false")))
        .send()
        .await
        .unwrap();
    let inactive: Value = resp.json().await.unwrap();
    assert!(
        inactive
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["id"] == promotion["id"])
    );

    let resp = admin
        .auth(admin.client.put(&promotion_url))
        .json(&json!({
            "name": promotion["name"],
            "end_date": "2098-12-31T00:00:00Z",
            "discount": 8,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["end_date"].is_array());

    let resp = admin
        .auth(admin.client.post(url("/admin/promotion/")))
        .json(&json!({
            "name": "Too generous",
            "end_date": "2099-01-31T00:00:00Z",
            "discount": 11,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = admin
        .auth(admin.client.delete(&promotion_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_user_flags_and_cart_listing() {
    let admin = Session::admin().await;
    let user = Session::register().await;
    let product = create_product(&admin, "500.00", 2).await;
    let product_id = product["id"].as_i64().unwrap();

    user.auth(user.client.post(url("/cart/")))
        .json(&json!({ "product": product_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();

    let resp = admin
        .auth(admin.client.get(url(&format!("/admin/user/?search={}", user.username))))
        .send()
        .await
        .unwrap();
    let users: Value = resp.json().await.unwrap();
    let found = &users.as_array().unwrap()[0];
    assert_eq!(found["is_vip"], false);

    let resp = admin
        .auth(admin.client.patch(url(&format!("/admin/user/{}/", found["id"]))))
        .json(&json!({ "is_vip": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["is_vip"], true);
    assert_eq!(updated["is_active"], true);

    let resp = admin
        .auth(admin.client.get(url(&format!("/admin/cart/?search={}", user.username))))
        .send()
        .await
        .unwrap();
    let carts: Value = resp.json().await.unwrap();
    let cart = &carts.as_array().unwrap()[0];
    assert_eq!(cart["username"], user.username.as_str());
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["original_total_price"], "1000.00");

    delete_product(&admin, product_id).await;
}
