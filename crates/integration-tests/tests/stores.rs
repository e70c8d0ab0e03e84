//! Integration tests for store browsing with viewer-specific flags.

use axum::http::StatusCode;
use serde_json::{Value, json};

use storerate_core::StoreId;
use storerate_integration_tests::TestApp;

async fn seed_catalog(app: &TestApp) -> (StoreId, StoreId) {
    let first = app
        .seed_store("Hartman's General Goods", "shop@hartmans.example.com", None)
        .await;
    let second = app
        .seed_store("Delaney Hardware Supplies", "shop@delaney.example.com", None)
        .await;
    (first, second)
}

fn find_store<'a>(body: &'a Value, id: StoreId) -> &'a Value {
    body["stores"]
        .as_array()
        .expect("no stores array")
        .iter()
        .find(|s| s["id"] == json!(id))
        .expect("store missing from listing")
}

#[tokio::test]
async fn test_health_endpoint_is_public() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

/// A browser preflight must be answered with CORS headers so web clients
/// can call the API at all.
#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let app = TestApp::new();

    let response = app
        .preflight("/api/auth/login", "http://localhost:5173", "POST")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let allow_origin = response
        .headers()
        .get("access-control-allow-origin")
        .expect("no allow-origin header");
    assert_eq!(allow_origin, "*");
    let allow_methods = response
        .headers()
        .get("access-control-allow-methods")
        .expect("no allow-methods header")
        .to_str()
        .expect("header is not ascii");
    assert!(allow_methods.contains("POST"));
}

#[tokio::test]
async fn test_listing_carries_viewer_rating_and_action_flags() {
    let app = TestApp::new();
    let (rated, unrated) = seed_catalog(&app).await;
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;
    app.post(
        "/api/ratings",
        Some(&token),
        json!({ "store_id": rated, "rating": 5 }),
    )
    .await;

    let (status, body) = app.get("/api/stores", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    let rated_row = find_store(&body, rated);
    assert_eq!(rated_row["user_rating"], 5);
    assert_eq!(rated_row["can_rate"], false);
    assert_eq!(rated_row["can_modify"], true);

    let unrated_row = find_store(&body, unrated);
    assert_eq!(unrated_row["user_rating"], Value::Null);
    assert_eq!(unrated_row["can_rate"], true);
    assert_eq!(unrated_row["can_modify"], false);
}

#[tokio::test]
async fn test_flags_are_per_viewer() {
    let app = TestApp::new();
    let (store_id, _) = seed_catalog(&app).await;
    let rater = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;
    let bystander = app
        .signup("Benjamin Cole Other Shopper", "benjamin@example.com")
        .await;
    app.post(
        "/api/ratings",
        Some(&rater),
        json!({ "store_id": store_id, "rating": 4 }),
    )
    .await;

    let (_, body) = app.get("/api/stores", Some(&bystander)).await;

    let row = find_store(&body, store_id);
    assert_eq!(row["user_rating"], Value::Null);
    assert_eq!(row["can_rate"], true);
}

#[tokio::test]
async fn test_listing_filters_by_name_substring() {
    let app = TestApp::new();
    let (_, delaney) = seed_catalog(&app).await;
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status, body) = app.get("/api/stores?name=delaney", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    let stores = body["stores"].as_array().expect("no stores array");
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0]["id"], json!(delaney));
}

#[tokio::test]
async fn test_listing_sorts_by_rating_descending() {
    let app = TestApp::new();
    let (first, second) = seed_catalog(&app).await;
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;
    app.post(
        "/api/ratings",
        Some(&token),
        json!({ "store_id": second, "rating": 5 }),
    )
    .await;

    let (_, body) = app
        .get("/api/stores?sort=rating&order=desc", Some(&token))
        .await;

    let stores = body["stores"].as_array().expect("no stores array");
    assert_eq!(stores[0]["id"], json!(second));
    assert_eq!(stores[1]["id"], json!(first));
}

#[tokio::test]
async fn test_detail_includes_recent_ratings() {
    let app = TestApp::new();
    let (store_id, _) = seed_catalog(&app).await;
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;
    app.post(
        "/api/ratings",
        Some(&token),
        json!({ "store_id": store_id, "rating": 5 }),
    )
    .await;

    let (status, body) = app
        .get(&format!("/api/stores/{store_id}"), Some(&token))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"]["total_ratings"], 1);
    assert_eq!(body["store"]["user_rating"], 5);
    let recent = body["recent_ratings"].as_array().expect("no recent ratings");
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0]["rating"], 5);
    assert_eq!(recent[0]["user_name"], "Avery Johnson Ratings Tester");
}

#[tokio::test]
async fn test_detail_unknown_store_is_not_found() {
    let app = TestApp::new();
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status, body) = app.get("/api/stores/9999", Some(&token)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Store not found");
}
