//! Integration tests for the ThinkPad Store API.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate, create a superuser and start the server
//! ts-cli migrate
//! ts-cli createsuperuser -u admin -e admin@example.com -p 'admin-pass-123'
//! ts-cli runserver
//!
//! # Run integration tests
//! STORE_ADMIN_USERNAME=admin STORE_ADMIN_PASSWORD='admin-pass-123' \
//!     cargo test -p thinkpad-store-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STORE_BASE_URL` - Server under test (default: `http://127.0.0.1:8000`)
//! - `STORE_ADMIN_USERNAME` / `STORE_ADMIN_PASSWORD` - Superuser for admin tests

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("STORE_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
}

/// Absolute URL for `path`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url().trim_end_matches('/'))
}

/// Short random suffix for unique usernames and product names.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(10);
    format!("{prefix}_{id}")
}

/// A logged-in API user.
pub struct Session {
    pub client: Client,
    pub username: String,
    pub access: String,
    pub refresh: String,
}

impl Session {
    /// Attach the bearer token to a request.
    pub fn auth(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.access)
    }

    /// Log in with existing credentials.
    ///
    /// # Panics
    ///
    /// Panics if the server is unreachable or the credentials are rejected.
    pub async fn login(username: &str, password: &str) -> Self {
        let client = Client::new();
        let resp = client
            .post(url("/login/token/"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to log in");
        assert_eq!(resp.status(), StatusCode::OK, "login failed for {username}");

        let tokens: Value = resp.json().await.expect("Failed to read tokens");
        Self {
            client,
            username: username.to_owned(),
            access: tokens["access"].as_str().expect("access token").to_owned(),
            refresh: tokens["refresh"].as_str().expect("refresh token").to_owned(),
        }
    }

    /// Register a fresh user and log in.
    ///
    /// # Panics
    ///
    /// Panics if registration or login fails.
    pub async fn register() -> Self {
        let username = unique("user");
        let password = "correct-horse-42";
        let resp = Client::new()
            .post(url("/register/"))
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": password,
            }))
            .send()
            .await
            .expect("Failed to register");
        assert_eq!(resp.status(), StatusCode::CREATED);

        Self::login(&username, password).await
    }

    /// Log in as the configured superuser.
    ///
    /// # Panics
    ///
    /// Panics if `STORE_ADMIN_USERNAME` / `STORE_ADMIN_PASSWORD` are unset.
    pub async fn admin() -> Self {
        let username =
            std::env::var("STORE_ADMIN_USERNAME").expect("STORE_ADMIN_USERNAME must be set");
        let password =
            std::env::var("STORE_ADMIN_PASSWORD").expect("STORE_ADMIN_PASSWORD must be set");
        Self::login(&username, &password).await
    }
}

/// Smallest valid PNG (1x1 transparent pixel).
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Create a product through the admin API and return its JSON.
///
/// # Panics
///
/// Panics if the request fails.
pub async fn create_product(admin: &Session, price: &str, stock: i32) -> Value {
    let form = reqwest::multipart::Form::new()
        .text("name", unique("ThinkPad"))
        .text("model", "Gen Test")
        .text("price", price.to_owned())
        .text("description", "Integration test product")
        .text("stock", stock.to_string());

    let resp = admin
        .auth(admin.client.post(url("/admin/product/")))
        .multipart(form)
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("Failed to read product")
}

/// Delete a product through the admin API, ignoring failures.
pub async fn delete_product(admin: &Session, id: i64) {
    let _ = admin
        .auth(admin.client.delete(url(&format!("/admin/product/{id}/"))))
        .send()
        .await;
}
