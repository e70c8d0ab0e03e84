//! Integration tests for signup, login, token verification, and role gates.

use axum::http::StatusCode;
use serde_json::json;

use storerate_core::Role;
use storerate_integration_tests::{TEST_PASSWORD, TestApp};

// ============================================================================
// Signup & Login
// ============================================================================

#[tokio::test]
async fn test_signup_returns_token_and_user_role() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/auth/signup",
            None,
            json!({
                "name": "Avery Johnson Ratings Tester",
                "email": "avery@example.com",
                "password": TEST_PASSWORD,
                "address": "1 Test Street",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully");
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["email"], "avery@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_signup_rejects_short_name() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/auth/signup",
            None,
            json!({
                "name": "Too Short",
                "email": "short@example.com",
                "password": TEST_PASSWORD,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_signup_rejects_weak_password() {
    let app = TestApp::new();

    // No uppercase, no special character.
    let (status, _) = app
        .post(
            "/api/auth/signup",
            None,
            json!({
                "name": "Avery Johnson Ratings Tester",
                "email": "avery@example.com",
                "password": "lowercase1",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signup_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status, _) = app
        .post(
            "/api/auth/signup",
            None,
            json!({
                "name": "Another Person Entirely Here",
                "email": "avery@example.com",
                "password": TEST_PASSWORD,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_email_look_identical() {
    let app = TestApp::new();
    app.signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status_wrong, body_wrong) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "avery@example.com", "password": "Wrong#Pass1" }),
        )
        .await;
    let (status_unknown, body_unknown) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "nobody@example.com", "password": TEST_PASSWORD }),
        )
        .await;

    assert_eq!(status_wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(status_unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(body_wrong["error"], body_unknown["error"]);
}

// ============================================================================
// Token verification
// ============================================================================

#[tokio::test]
async fn test_verify_accepts_fresh_token() {
    let app = TestApp::new();
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status, body) = app
        .request(
            axum::http::Method::POST,
            "/api/auth/verify",
            Some(&token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["email"], "avery@example.com");
}

#[tokio::test]
async fn test_verify_rejects_tampered_token() {
    let app = TestApp::new();
    let mut token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;
    token.push('x');

    let (status, _) = app
        .request(
            axum::http::Method::POST,
            "/api/auth/verify",
            Some(&token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Role gates
// ============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/stores", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn test_user_token_cannot_reach_admin_routes() {
    let app = TestApp::new();
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status, body) = app.get("/api/admin/dashboard", Some(&token)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");
}

#[tokio::test]
async fn test_user_token_cannot_reach_owner_routes() {
    let app = TestApp::new();
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status, body) = app.get("/api/owner/dashboard", Some(&token)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Owner access required");
}

#[tokio::test]
async fn test_owner_cannot_rate() {
    let app = TestApp::new();
    let (owner_id, owner_token) = app
        .seed_account(
            "Olivia Hartman Store Keeper",
            "olivia@example.com",
            Role::Owner,
        )
        .await;
    let store_id = app
        .seed_store("Hartman's General Goods", "shop@hartmans.example.com", Some(owner_id))
        .await;

    let (status, body) = app
        .post(
            "/api/ratings",
            Some(&owner_token),
            json!({ "store_id": store_id, "rating": 5 }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only normal users can rate stores");
}

// ============================================================================
// Profile & password change
// ============================================================================

#[tokio::test]
async fn test_profile_returns_current_account() {
    let app = TestApp::new();
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status, body) = app.get("/api/users/profile", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Avery Johnson Ratings Tester");
}

#[tokio::test]
async fn test_update_profile_changes_name_and_address() {
    let app = TestApp::new();
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status, body) = app
        .put(
            "/api/users/profile",
            Some(&token),
            json!({ "name": "Avery Johnson Renamed Tester", "address": "9 New Lane" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Profile updated successfully");
    assert_eq!(body["user"]["name"], "Avery Johnson Renamed Tester");
    assert_eq!(body["user"]["address"], "9 New Lane");

    // The change survives a fresh read.
    let (_, body) = app.get("/api/users/profile", Some(&token)).await;
    assert_eq!(body["user"]["name"], "Avery Johnson Renamed Tester");
}

#[tokio::test]
async fn test_update_profile_rejects_empty_and_invalid_payloads() {
    let app = TestApp::new();
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status, body) = app
        .put("/api/users/profile", Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No fields to update");

    let (status, _) = app
        .put(
            "/api/users/profile",
            Some(&token),
            json!({ "name": "Too Short" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A rejected update leaves the profile untouched.
    let (_, body) = app.get("/api/users/profile", Some(&token)).await;
    assert_eq!(body["user"]["name"], "Avery Johnson Ratings Tester");
}

#[tokio::test]
async fn test_update_password_invalidates_old_credentials() {
    let app = TestApp::new();
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status, body) = app
        .put(
            "/api/users/update-password",
            Some(&token),
            json!({ "current_password": TEST_PASSWORD, "new_password": "Fresh#Pass2" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Password updated successfully");

    // Old password no longer works, new one does.
    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "avery@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.login("avery@example.com", "Fresh#Pass2").await;
}

#[tokio::test]
async fn test_update_password_requires_current_password() {
    let app = TestApp::new();
    let token = app
        .signup("Avery Johnson Ratings Tester", "avery@example.com")
        .await;

    let (status, _) = app
        .put(
            "/api/users/update-password",
            Some(&token),
            json!({ "current_password": "Wrong#Pass1", "new_password": "Fresh#Pass2" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
