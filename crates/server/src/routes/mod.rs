//! HTTP route handlers for the rating API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /api/health                 - Health check
//!
//! # Auth
//! POST /api/auth/signup            - Register a new account (role: user)
//! POST /api/auth/login             - Login, returns a bearer token
//! POST /api/auth/verify            - Verify a token and return its account
//!
//! # Stores (any authenticated account)
//! GET  /api/stores                 - List stores with the caller's own rating
//! GET  /api/stores/{id}            - Store detail with recent ratings
//!
//! # Ratings (role: user)
//! POST   /api/ratings              - Submit a rating for a store
//! PUT    /api/ratings              - Modify an existing rating
//! DELETE /api/ratings/{store_id}   - Delete a rating
//! GET    /api/ratings/my-ratings   - The caller's ratings with store info
//!
//! # Account
//! GET  /api/users/profile           - Current account profile
//! PUT  /api/users/profile           - Update own name/address
//! PUT  /api/users/update-password   - Change password
//!
//! # Owner dashboard (role: owner)
//! GET  /api/owner/dashboard        - Store stats, breakdown, recent ratings
//! GET  /api/owner/store            - The owner's store record
//! GET  /api/owner/ratings          - Paginated ratings with rater info
//! GET  /api/owner/analytics        - Trend analytics over a period
//!
//! # Admin (role: admin)
//! GET    /api/admin/dashboard      - Platform stats and recent activity
//! GET    /api/admin/users          - List accounts with filter/sort/paging
//! POST   /api/admin/users          - Create an account with any role
//! GET    /api/admin/users/{id}     - Account detail
//! PUT    /api/admin/users/{id}     - Update an account
//! DELETE /api/admin/users/{id}     - Delete an account (cascades ratings)
//! GET    /api/admin/stores         - List stores with filter/sort/paging
//! POST   /api/admin/stores         - Create a store
//! PUT    /api/admin/stores/{id}    - Update a store
//! DELETE /api/admin/stores/{id}    - Delete a store (cascades ratings)
//! ```

pub mod admin;
pub mod auth;
pub mod owner;
pub mod ratings;
pub mod stores;
pub mod user;

use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/verify", post(auth::verify))
}

/// Create the store browsing routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/{id}", get(stores::show))
}

/// Create the rating routes router.
pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(ratings::submit).put(ratings::modify))
        .route("/{store_id}", delete(ratings::remove))
        .route("/my-ratings", get(ratings::my_ratings))
}

/// Create the account routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(user::profile).put(user::update_profile))
        .route("/update-password", put(user::update_password))
}

/// Create the owner dashboard routes router.
pub fn owner_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(owner::dashboard))
        .route("/store", get(owner::store))
        .route("/ratings", get(owner::ratings))
        .route("/analytics", get(owner::analytics))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            get(admin::show_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/stores", get(admin::list_stores).post(admin::create_store))
        .route(
            "/stores/{id}",
            put(admin::update_store).delete(admin::delete_store),
        )
}

/// Health check endpoint.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/auth", auth_routes())
        .nest("/api/stores", store_routes())
        .nest("/api/ratings", rating_routes())
        .nest("/api/users", user_routes())
        .nest("/api/owner", owner_routes())
        .nest("/api/admin", admin_routes())
}
