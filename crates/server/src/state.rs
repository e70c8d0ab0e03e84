//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;

use storerate_core::StoreId;

use crate::config::ServerConfig;
use crate::services::auth::AuthService;
use crate::store::RatingStore;

/// How long a cached dashboard snapshot may be served before it is
/// recomputed. Mutations invalidate eagerly; the TTL is a backstop.
const DASHBOARD_TTL: Duration = Duration::from_secs(60);

/// Cached dashboard projections.
///
/// These are derived, disposable snapshots of the admin and owner dashboard
/// responses. Every rating or account mutation invalidates them
/// synchronously before the mutation returns, so a subsequent read never
/// serves a summary older than the write it follows.
pub struct DashboardCache {
    admin: Cache<(), Arc<Value>>,
    owner: Cache<StoreId, Arc<Value>>,
}

impl DashboardCache {
    fn new() -> Self {
        Self {
            admin: Cache::builder()
                .max_capacity(1)
                .time_to_live(DASHBOARD_TTL)
                .build(),
            owner: Cache::builder()
                .max_capacity(1024)
                .time_to_live(DASHBOARD_TTL)
                .build(),
        }
    }

    pub async fn admin_snapshot(&self) -> Option<Arc<Value>> {
        self.admin.get(&()).await
    }

    pub async fn store_admin_snapshot(&self, snapshot: Arc<Value>) {
        self.admin.insert((), snapshot).await;
    }

    pub async fn owner_snapshot(&self, store_id: StoreId) -> Option<Arc<Value>> {
        self.owner.get(&store_id).await
    }

    pub async fn store_owner_snapshot(&self, store_id: StoreId, snapshot: Arc<Value>) {
        self.owner.insert(store_id, snapshot).await;
    }

    /// Drop the admin snapshot after any account, store, or rating mutation.
    pub async fn invalidate_admin(&self) {
        self.admin.invalidate(&()).await;
    }

    /// Drop one store's owner snapshot after a rating mutation touches it.
    pub async fn invalidate_owner(&self, store_id: StoreId) {
        self.owner.invalidate(&store_id).await;
    }

    /// Drop everything; used when a cascade touches an unknown set of stores.
    pub fn invalidate_all(&self) {
        self.admin.invalidate_all();
        self.owner.invalidate_all();
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the storage backend and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn RatingStore>,
    auth: AuthService,
    dashboards: DashboardCache,
}

impl AppState {
    /// Create a new application state over the given storage backend.
    #[must_use]
    pub fn new(config: ServerConfig, store: Arc<dyn RatingStore>) -> Self {
        let auth = AuthService::new(Arc::clone(&store), &config.jwt_secret);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                auth,
                dashboards: DashboardCache::new(),
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn store(&self) -> &dyn RatingStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the authentication service.
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get a reference to the dashboard cache.
    #[must_use]
    pub fn dashboards(&self) -> &DashboardCache {
        &self.inner.dashboards
    }
}
