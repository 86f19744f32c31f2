//! Integration tests for the admin product API.
//!
//! Runs the real admin router against the in-process fake backend, which
//! enforces the same constraints as the managed database.

#![allow(clippy::unwrap_used)]

use futures::future::join_all;
use reqwest::StatusCode;
use serde_json::{Value, json};

use shelfmark_integration_tests::TestApp;

struct Admin {
    app: TestApp,
    token: String,
}

impl Admin {
    async fn spawn() -> Self {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        Self { app, token }
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self
            .app
            .client
            .request(method, self.app.url(path))
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        let status = response.status();
        let text = response.text().await.unwrap();
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (status, body)
    }

    async fn create(&self, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, "/admin/products", Some(body)).await
    }

    async fn get(&self, slug: &str) -> (StatusCode, Value) {
        self.send(reqwest::Method::GET, &format!("/admin/products/{slug}"), None)
            .await
    }

    async fn patch(&self, slug: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            reqwest::Method::PATCH,
            &format!("/admin/products/{slug}"),
            Some(body),
        )
        .await
    }

    async fn delete(&self, slug: &str) -> (StatusCode, Value) {
        self.send(reqwest::Method::DELETE, &format!("/admin/products/{slug}"), None)
            .await
    }
}

fn jacket() -> Value {
    json!({
        "slug": "denim-jacket",
        "title": "Denim Jacket",
        "description": "Lightly worn",
        "price": 45.0,
        "images": ["https://cdn.example/jacket.jpg"],
        "brand": "Levi's",
        "condition": "good",
    })
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_product() {
    let admin = Admin::spawn().await;
    let (status, body) = admin.create(jacket()).await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["slug"], "denim-jacket");
    assert_eq!(body["title"], "Denim Jacket");
    assert_eq!(body["price"], 45.0);
    assert_eq!(body["brand"], "Levi's");
    // Column defaults applied by the database
    assert_eq!(body["featured"], false);
    assert!(body["created_at"].is_string());

    assert!(admin.app.backend.product("denim-jacket").is_some());
}

#[tokio::test]
async fn test_create_duplicate_slug_conflicts() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;

    let (status, body) = admin
        .create(json!({ "slug": "denim-jacket", "title": "Another" }))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "unique_violation");
    assert!(body["message"].as_str().unwrap().contains("duplicate key"));
    assert_eq!(admin.app.backend.product_count(), 1);
}

#[tokio::test]
async fn test_create_without_title_is_not_null_violation() {
    let admin = Admin::spawn().await;
    let (status, body) = admin.create(json!({ "slug": "untitled" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "not_null_violation");
    assert!(admin.app.backend.product("untitled").is_none());
}

#[tokio::test]
async fn test_create_rejects_invalid_slug() {
    let admin = Admin::spawn().await;
    let (status, body) = admin
        .create(json!({ "slug": "no spaces/allowed", "title": "Bad" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
    assert_eq!(admin.app.backend.product_count(), 0);
}

// ============================================================================
// Read
// ============================================================================

#[tokio::test]
async fn test_list_newest_first_and_get() {
    let admin = Admin::spawn().await;
    admin.create(json!({ "slug": "first", "title": "First" })).await;
    admin.create(json!({ "slug": "second", "title": "Second" })).await;

    let (status, body) = admin.send(reqwest::Method::GET, "/admin/products", None).await;
    assert_eq!(status, StatusCode::OK);
    let slugs: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, ["second", "first"]);

    let (status, body) = admin.get("first").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "First");

    let (status, body) = admin.get("missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

// ============================================================================
// Partial update
// ============================================================================

#[tokio::test]
async fn test_update_title_and_price_only() {
    let admin = Admin::spawn().await;
    let (_, before) = admin.create(jacket()).await;

    let (status, after) = admin
        .patch("denim-jacket", json!({ "title": "Vintage Denim Jacket", "price": 55.5 }))
        .await;

    assert_eq!(status, StatusCode::OK, "{after}");
    assert_eq!(after["title"], "Vintage Denim Jacket");
    assert_eq!(after["price"], 55.5);
    for field in ["slug", "description", "images", "brand", "condition", "in_stock"] {
        assert_eq!(after[field], before[field], "{field} changed");
    }
}

#[tokio::test]
async fn test_update_ignores_empty_title() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;

    let (status, body) = admin.patch("denim-jacket", json!({ "title": "   " })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Denim Jacket");

    let (_, body) = admin.get("denim-jacket").await;
    assert_eq!(body["title"], "Denim Jacket");
}

#[tokio::test]
async fn test_update_ignores_string_price() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;

    let (status, body) = admin
        .patch("denim-jacket", json!({ "price": "abc", "brand": "Wrangler" }))
        .await;

    // The string price is dropped; the rest of the patch still applies.
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["price"], 45.0);
    assert_eq!(body["brand"], "Wrangler");
}

#[tokio::test]
async fn test_update_rejects_price_outside_decimal_range() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;

    let (status, body) = admin.patch("denim-jacket", json!({ "price": 1e30 })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
    let (_, body) = admin.get("denim-jacket").await;
    assert_eq!(body["price"], 45.0);
}

#[tokio::test]
async fn test_update_null_clears_nullable_field() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;

    let (status, body) = admin
        .patch("denim-jacket", json!({ "description": null, "title": null }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], Value::Null);
    // title is required; null is not a usable value and is ignored
    assert_eq!(body["title"], "Denim Jacket");
}

#[tokio::test]
async fn test_update_with_nothing_writable_returns_current_row() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;
    let before = admin.app.backend.product("denim-jacket").unwrap();

    let (status, body) = admin
        .patch("denim-jacket", json!({ "unknown": 1, "in_stock": "yes" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Denim Jacket");
    // No write happened, so updated_at is untouched.
    let after = admin.app.backend.product("denim-jacket").unwrap();
    assert_eq!(after["updated_at"], before["updated_at"]);
}

#[tokio::test]
async fn test_update_rejects_non_object_body() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;

    let (status, body) = admin.patch("denim-jacket", json!(["title"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_update_missing_product_is_not_found() {
    let admin = Admin::spawn().await;
    let (status, body) = admin.patch("ghost", json!({ "title": "Boo" })).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = admin.patch("ghost", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_updates_last_writer_wins() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;

    let titles: Vec<String> = (0..5).map(|i| format!("Racer {i}")).collect();
    let results = join_all(
        titles
            .iter()
            .map(|title| admin.patch("denim-jacket", json!({ "title": title }))),
    )
    .await;
    for (status, body) in results {
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (_, body) = admin.get("denim-jacket").await;
    let final_title = body["title"].as_str().unwrap();
    assert!(titles.iter().any(|t| t == final_title), "{final_title}");
}

// ============================================================================
// Rename
// ============================================================================

#[tokio::test]
async fn test_rename_moves_product() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;

    let (status, body) = admin
        .patch("denim-jacket", json!({ "slug": "vintage-denim-jacket" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["slug"], "vintage-denim-jacket");

    let (status, _) = admin.get("denim-jacket").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = admin.get("vintage-denim-jacket").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Denim Jacket");
}

#[tokio::test]
async fn test_rename_onto_existing_slug_conflicts() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;
    admin.create(json!({ "slug": "wool-coat", "title": "Wool Coat" })).await;

    let (status, body) = admin.patch("wool-coat", json!({ "slug": "denim-jacket" })).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "unique_violation");
    assert!(admin.app.backend.product("wool-coat").is_some());
}

#[tokio::test]
async fn test_rename_to_invalid_slug_is_bad_request() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;

    let (status, body) = admin.patch("denim-jacket", json!({ "slug": "a/b" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_product() {
    let admin = Admin::spawn().await;
    admin.create(jacket()).await;

    let (status, body) = admin.delete("denim-jacket").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "denim-jacket");

    let (status, _) = admin.get("denim-jacket").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(admin.app.backend.product_count(), 0);
}

#[tokio::test]
async fn test_delete_missing_product_is_not_found() {
    let admin = Admin::spawn().await;
    let (status, body) = admin.delete("ghost").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}
