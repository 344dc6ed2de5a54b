//! Integration tests for the per-user cart.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (ts-cli migrate)
//! - The API server running (ts-cli runserver)
//! - A superuser (`STORE_ADMIN_USERNAME` / `STORE_ADMIN_PASSWORD`)
//! - No promotion active while they run
//!
//! Run with: cargo test -p thinkpad-store-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use thinkpad_store_integration_tests::{Session, create_product, delete_product, url};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_add_merges_quantities() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "1999.99", 10).await;
    let product_id = product["id"].as_i64().unwrap();
    let user = Session::register().await;

    let resp = user
        .auth(user.client.post(url("/cart/")))
        .json(&json!({ "product": product_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let first: Value = resp.json().await.unwrap();
    assert_eq!(first["quantity"], 1);

    let resp = user
        .auth(user.client.post(url("/cart/")))
        .json(&json!({ "product": product_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let merged: Value = resp.json().await.unwrap();
    assert_eq!(merged["id"], first["id"]);
    assert_eq!(merged["quantity"], 3);
    assert_eq!(merged["original_total_price"], "5999.97");

    let resp = user
        .auth(user.client.get(url("/cart/summary/")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let summary: Value = resp.json().await.unwrap();
    assert_eq!(summary["user"], user.username.as_str());
    assert_eq!(summary["item_count"], 3);
    assert_eq!(summary["original_total_price"], "5999.97");

    delete_product(&admin, product_id).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_items_are_private() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "100.00", 1).await;
    let product_id = product["id"].as_i64().unwrap();

    let owner = Session::register().await;
    let resp = owner
        .auth(owner.client.post(url("/cart/")))
        .json(&json!({ "product": product_id }))
        .send()
        .await
        .unwrap();
    let item: Value = resp.json().await.unwrap();
    let item_id = item["id"].as_i64().unwrap();

    let other = Session::register().await;
    let resp = other
        .auth(other.client.get(url(&format!("/cart/{item_id}/"))))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = other
        .auth(other.client.delete(url(&format!("/cart/{item_id}/"))))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    delete_product(&admin, product_id).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_update_and_delete_item() {
    let admin = Session::admin().await;
    let product = create_product(&admin, "250.00", 5).await;
    let product_id = product["id"].as_i64().unwrap();
    let user = Session::register().await;

    let resp = user
        .auth(user.client.post(url("/cart/")))
        .json(&json!({ "product": product_id }))
        .send()
        .await
        .unwrap();
    let item: Value = resp.json().await.unwrap();
    let item_url = url(&format!("/cart/{}/", item["id"]));

    let resp = user
        .auth(user.client.patch(&item_url))
        .json(&json!({ "quantity": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["quantity"], 4);
    assert_eq!(updated["original_total_price"], "1000.00");

    let resp = user
        .auth(user.client.patch(&item_url))
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = user
        .auth(user.client.delete(&item_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = user
        .auth(user.client.get(url("/cart/")))
        .send()
        .await
        .unwrap();
    let items: Value = resp.json().await.unwrap();
    assert!(items.as_array().unwrap().is_empty());

    delete_product(&admin, product_id).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_replace_without_quantity_keeps_quantity() {
    let admin = Session::admin().await;
    let first = create_product(&admin, "100.00", 5).await;
    let second = create_product(&admin, "300.00", 5).await;
    let first_id = first["id"].as_i64().unwrap();
    let second_id = second["id"].as_i64().unwrap();
    let user = Session::register().await;

    let resp = user
        .auth(user.client.post(url("/cart/")))
        .json(&json!({ "product": first_id, "quantity": 3 }))
        .send()
        .await
        .unwrap();
    let item: Value = resp.json().await.unwrap();
    let item_url = url(&format!("/cart/{}/", item["id"]));

    let resp = user
        .auth(user.client.put(&item_url))
        .json(&json!({ "product": second_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let replaced: Value = resp.json().await.unwrap();
    assert_eq!(replaced["product"], second_id);
    assert_eq!(replaced["quantity"], 3);
    assert_eq!(replaced["original_total_price"], "900.00");

    delete_product(&admin, first_id).await;
    delete_product(&admin, second_id).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_unknown_product_is_rejected() {
    let user = Session::register().await;
    let resp = user
        .auth(user.client.post(url("/cart/")))
        .json(&json!({ "product": 2_147_483_647 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["product"][0],
        "Invalid pk \"2147483647\" - object does not exist."
    );
}
