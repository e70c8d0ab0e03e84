//! Store browsing for authenticated accounts.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storerate_core::{Email, Score, StoreId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Page, Pagination, StoreWithViewerRating};
use crate::state::AppState;
use crate::store::{SortOrder, StoreQuery, StoreSortField};

/// Query parameters for the store listing.
#[derive(Debug, Deserialize)]
pub struct StoreListParams {
    pub name: Option<String>,
    pub address: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const fn default_page() -> u32 {
    1
}

const fn default_limit() -> u32 {
    10
}

/// One store row as the viewer sees it: the public summary plus the
/// viewer's own rating and the action it enables.
#[derive(Debug, Serialize)]
pub struct StoreListItem {
    pub id: StoreId,
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
    pub rating: f64,
    pub total_ratings: i32,
    pub created_at: DateTime<Utc>,
    pub user_rating: Option<Score>,
    pub can_rate: bool,
    pub can_modify: bool,
}

impl From<StoreWithViewerRating> for StoreListItem {
    fn from(store: StoreWithViewerRating) -> Self {
        let rated = store.user_rating.is_some();
        Self {
            id: store.id,
            name: store.name,
            email: store.email,
            address: store.address,
            rating: store.rating,
            total_ratings: store.total_ratings,
            created_at: store.created_at,
            user_rating: store.user_rating,
            can_rate: !rated,
            can_modify: rated,
        }
    }
}

/// Paginated store listing.
#[derive(Debug, Serialize)]
pub struct StoreListResponse {
    pub stores: Vec<StoreListItem>,
    pub pagination: Pagination,
}

/// List stores with the caller's own rating attached.
///
/// GET /api/stores
///
/// Supports substring filters on name and address, whitelisted sorting,
/// and pagination. Unknown sort fields fall back to the default rather
/// than erroring.
///
/// # Errors
///
/// Returns 503 if storage is unavailable.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Query(params): Query<StoreListParams>,
) -> Result<Json<StoreListResponse>> {
    let query = StoreQuery {
        name: params.name,
        address: params.address,
        sort: params
            .sort
            .as_deref()
            .map(StoreSortField::parse)
            .unwrap_or_default(),
        order: params
            .order
            .as_deref()
            .map(SortOrder::parse)
            .unwrap_or_default(),
        page: params.page.max(1),
        limit: params.limit.clamp(1, 100),
    };

    let Page { items, pagination } = state.store().list_stores(query, identity.id).await?;

    Ok(Json(StoreListResponse {
        stores: items.into_iter().map(StoreListItem::from).collect(),
        pagination,
    }))
}

/// One recent rating on the store detail page.
#[derive(Debug, Serialize)]
pub struct RecentRating {
    pub rating: Score,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
}

/// Store detail response.
#[derive(Debug, Serialize)]
pub struct StoreDetailResponse {
    pub store: StoreListItem,
    pub recent_ratings: Vec<RecentRating>,
}

/// Store detail with the ten most recent ratings.
///
/// GET /api/stores/{id}
///
/// # Errors
///
/// Returns 404 for an unknown store.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<StoreDetailResponse>> {
    let store_id = StoreId::new(id);

    let store = state
        .store()
        .store_by_id(store_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Store not found".to_owned()))?;
    let user_rating = state
        .store()
        .rating_for(identity.id, store_id)
        .await?
        .map(|r| r.score);

    let mut ratings = state.store().ratings_for_store(store_id).await?;
    ratings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_ratings = ratings
        .into_iter()
        .take(10)
        .map(|r| RecentRating {
            rating: r.score,
            created_at: r.created_at,
            user_name: r.user_name,
        })
        .collect();

    let rated = user_rating.is_some();
    Ok(Json(StoreDetailResponse {
        store: StoreListItem {
            id: store.id,
            name: store.name,
            email: store.email,
            address: store.address,
            rating: store.rating,
            total_ratings: store.total_ratings,
            created_at: store.created_at,
            user_rating,
            can_rate: !rated,
            can_modify: rated,
        },
        recent_ratings,
    }))
}
