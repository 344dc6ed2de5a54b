//! Integration tests for registration, login and JWT refresh.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (ts-cli migrate)
//! - The API server running (ts-cli runserver)
//! - A superuser (`STORE_ADMIN_USERNAME` / `STORE_ADMIN_PASSWORD`) for the
//!   deactivation test
//!
//! Run with: cargo test -p thinkpad-store-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use thinkpad_store_integration_tests::{Session, unique, url};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_health() {
    let resp = Client::new().get(url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = Client::new().get(url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_register_returns_username_and_email() {
    let username = unique("reg");
    let resp = Client::new()
        .post(url("/register/"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@Example.COM"),
            "password": "long-enough-pw",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["username"], username.as_str());
    assert_eq!(body["email"], format!("{username}@example.com"));
    assert!(body.get("password").is_none());
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_register_duplicate_username() {
    let session = Session::register().await;
    let resp = Client::new()
        .post(url("/register/"))
        .json(&json!({
            "username": session.username,
            "email": format!("other_{}@example.com", session.username),
            "password": "long-enough-pw",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["username"].is_array());
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_register_short_password() {
    let username = unique("short");
    let resp = Client::new()
        .post(url("/register/"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "short",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["password"].is_array());
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_login_wrong_password() {
    let session = Session::register().await;
    let resp = Client::new()
        .post(url("/login/"))
        .json(&json!({ "username": session.username, "password": "not-the-password" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["detail"],
        "No active account found with the given credentials"
    );
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_refresh_issues_new_access_token() {
    let session = Session::register().await;

    let resp = session
        .client
        .post(url("/login/token/refresh/"))
        .json(&json!({ "refresh": session.refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert!(body["access"].is_string());

    // An access token is not a refresh token
    let resp = session
        .client
        .post(url("/login/token/refresh/"))
        .json(&json!({ "refresh": session.access }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "token_not_valid");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_refresh_rejected_after_deactivation() {
    let admin = Session::admin().await;
    let session = Session::register().await;

    let resp = admin
        .auth(admin.client.get(url(&format!("/admin/user/?search={}", session.username))))
        .send()
        .await
        .unwrap();
    let users: Value = resp.json().await.unwrap();
    let user_id = users[0]["id"].as_i64().unwrap();

    let resp = admin
        .auth(admin.client.patch(url(&format!("/admin/user/{user_id}/"))))
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = session
        .client
        .post(url("/login/token/refresh/"))
        .json(&json!({ "refresh": session.refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "no_active_account");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_users_lists_only_self() {
    let session = Session::register().await;

    let resp = session
        .auth(session.client.get(url("/users/")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], session.username.as_str());

    let resp = Client::new().get(url("/users/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
