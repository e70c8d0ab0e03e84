//! Integration tests for StoreRate.
//!
//! Tests drive the full axum router in-process against the memory storage
//! backend, so they need no running database or server.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storerate-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth_flow` - Signup, login, token verification, role gates
//! - `ratings` - Rating lifecycle and store aggregate consistency
//! - `stores` - Store browsing with viewer-specific flags
//! - `admin` - Admin dashboard and user/store management
//! - `owner_dashboard` - Owner dashboard and trend analytics

#![allow(clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use storerate_core::{Email, Role, StoreId, UserId};
use storerate_server::config::{ServerConfig, StorageBackend};
use storerate_server::services::auth::hash_password;
use storerate_server::state::AppState;
use storerate_server::store::{MemRatingStore, NewStore, NewUser, RatingStore};

/// Password shared by all accounts created through the helpers.
pub const TEST_PASSWORD: &str = "Passw0rd!";

/// An in-process application instance backed by [`MemRatingStore`].
///
/// The store handle is exposed so tests can seed state the API does not
/// allow, such as backdating rating timestamps for analytics scenarios.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemRatingStore>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let config = ServerConfig {
            database_url: None,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            backend: StorageBackend::Memory,
            jwt_secret: SecretString::from("46c1bd87e209f1a35b2d74c8e6a90d13f5b8a27e"),
            cors_origin: None,
            sentry_dsn: None,
        };
        let store = Arc::new(MemRatingStore::new());
        let state = AppState::new(config, Arc::clone(&store) as Arc<dyn RatingStore>);
        Self {
            router: storerate_server::app(state),
            store,
        }
    }

    /// Send a request and return the status plus the decoded JSON body.
    ///
    /// An empty response body decodes to `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is not JSON")
        };
        (status, value)
    }

    /// Send a CORS preflight request and return the raw response, so tests
    /// can inspect the `Access-Control-*` headers.
    pub async fn preflight(
        &self,
        path: &str,
        origin: &str,
        method: &str,
    ) -> axum::http::Response<Body> {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(path)
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, method)
            .body(Body::empty())
            .expect("failed to build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, token, None).await
    }

    /// Register a normal user through the public API and return their token.
    pub async fn signup(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/signup",
                None,
                json!({
                    "name": name,
                    "email": email,
                    "password": TEST_PASSWORD,
                    "address": "1 Test Street",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        body["token"]
            .as_str()
            .expect("signup response has no token")
            .to_owned()
    }

    /// Login through the public API and return the bearer token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"]
            .as_str()
            .expect("login response has no token")
            .to_owned()
    }

    /// Seed an account with an arbitrary role directly in storage, then
    /// login through the API. Returns the account id and token.
    pub async fn seed_account(&self, name: &str, email: &str, role: Role) -> (UserId, String) {
        let user = self
            .store
            .create_user(NewUser {
                name: name.to_owned(),
                email: Email::parse(email).expect("invalid seed email"),
                password_hash: hash_password(TEST_PASSWORD).expect("failed to hash password"),
                address: None,
                role,
            })
            .await
            .expect("failed to seed account");
        let token = self.login(email, TEST_PASSWORD).await;
        (user.id, token)
    }

    /// Seed a store directly in storage and return its id.
    pub async fn seed_store(&self, name: &str, email: &str, owner_id: Option<UserId>) -> StoreId {
        self.store
            .create_store(NewStore {
                name: name.to_owned(),
                email: Email::parse(email).expect("invalid seed email"),
                address: Some("9 Commerce Way".to_owned()),
                owner_id,
            })
            .await
            .expect("failed to seed store")
            .id
    }
}
