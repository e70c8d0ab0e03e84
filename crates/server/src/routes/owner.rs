//! Owner dashboard: store stats, rater listings, and trend analytics.
//!
//! Every handler resolves the caller's store first; an owner account with
//! no store gets 404 rather than an empty dashboard.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::middleware::{Identity, RequireOwner};
use crate::models::{Pagination, RatingEvent, Store};
use crate::services::analytics;
use crate::state::AppState;

const DEFAULT_PERIOD_DAYS: u32 = 30;

async fn owned_store(state: &AppState, identity: Identity) -> Result<Store> {
    state
        .store()
        .store_by_owner(identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No store found for this owner".to_owned()))
}

/// The owner's full dashboard: store summary, star breakdown, every rater,
/// and the ten most recent ratings. Cached per store; rating mutations
/// invalidate the snapshot synchronously.
///
/// GET /api/owner/dashboard
///
/// # Errors
///
/// Returns 404 when the owner has no store.
pub async fn dashboard(
    State(state): State<AppState>,
    RequireOwner(identity): RequireOwner,
) -> Result<Json<Value>> {
    let store = owned_store(&state, identity).await?;

    if let Some(snapshot) = state.dashboards().owner_snapshot(store.id).await {
        return Ok(Json((*snapshot).clone()));
    }

    let ratings = state.store().ratings_for_store(store.id).await?;
    let events: Vec<RatingEvent> = ratings
        .iter()
        .map(|r| RatingEvent {
            score: r.score,
            created_at: r.created_at,
        })
        .collect();
    let breakdown = analytics::rating_breakdown(&events);

    let mut recent = ratings.clone();
    recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    let recent_ratings: Vec<Value> = recent
        .iter()
        .take(10)
        .map(|r| {
            json!({
                "user_name": r.user_name,
                "rating": r.score,
                "created_at": r.created_at,
                "updated_at": r.updated_at,
            })
        })
        .collect();

    let snapshot = Arc::new(json!({
        "store": {
            "id": store.id,
            "name": store.name,
            "email": store.email,
            "address": store.address,
            "average_rating": store.rating,
            "total_ratings": store.total_ratings,
        },
        "statistics": {
            "total_ratings": store.total_ratings,
            "average_rating": store.rating,
            "rating_breakdown": breakdown,
        },
        "users_who_rated": ratings,
        "recent_ratings": recent_ratings,
    }));

    state
        .dashboards()
        .store_owner_snapshot(store.id, Arc::clone(&snapshot))
        .await;

    Ok(Json((*snapshot).clone()))
}

/// The owner's store record.
///
/// GET /api/owner/store
///
/// # Errors
///
/// Returns 404 when the owner has no store.
pub async fn store(
    State(state): State<AppState>,
    RequireOwner(identity): RequireOwner,
) -> Result<Json<Value>> {
    let store = owned_store(&state, identity).await?;
    Ok(Json(json!({ "store": store })))
}

/// Query parameters for the owner ratings listing.
#[derive(Debug, Deserialize)]
pub struct OwnerRatingsParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub sort: Option<String>,
    pub order: Option<String>,
}

const fn default_page() -> u32 {
    1
}

const fn default_limit() -> u32 {
    10
}

/// Paginated ratings for the owner's store with rater details.
///
/// GET /api/owner/ratings
///
/// Sortable by `rating`, `created_at`, `updated_at`, or `user_name`;
/// anything else falls back to `updated_at` descending.
///
/// # Errors
///
/// Returns 404 when the owner has no store.
pub async fn ratings(
    State(state): State<AppState>,
    RequireOwner(identity): RequireOwner,
    Query(params): Query<OwnerRatingsParams>,
) -> Result<Json<Value>> {
    let store = owned_store(&state, identity).await?;

    let mut ratings = state.store().ratings_for_store(store.id).await?;
    let descending = !params
        .order
        .as_deref()
        .is_some_and(|o| o.eq_ignore_ascii_case("asc"));
    ratings.sort_by(|a, b| {
        let ordering = match params.sort.as_deref() {
            Some("rating") => a.score.cmp(&b.score),
            Some("created_at") => a.created_at.cmp(&b.created_at),
            Some("user_name") => a.user_name.cmp(&b.user_name),
            _ => a.updated_at.cmp(&b.updated_at),
        };
        if descending { ordering.reverse() } else { ordering }
    });

    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let total = ratings.len() as i64;
    // Widened before multiplying; u32 page * u32 limit can overflow.
    let offset = usize::try_from(u64::from(page - 1) * u64::from(limit)).unwrap_or(usize::MAX);
    let items: Vec<_> = ratings
        .into_iter()
        .skip(offset)
        .take(limit as usize)
        .collect();

    Ok(Json(json!({
        "ratings": items,
        "pagination": Pagination::new(page, limit, total),
    })))
}

/// Query parameters for the analytics endpoint.
#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    #[serde(default = "default_period")]
    pub period: u32,
}

const fn default_period() -> u32 {
    DEFAULT_PERIOD_DAYS
}

/// Rating trends: per-day buckets over the requested period and a
/// comparison against the period immediately before it.
///
/// GET /api/owner/analytics?period=30
///
/// # Errors
///
/// Returns 400 for a zero-length period and 404 when the owner has no
/// store.
pub async fn analytics(
    State(state): State<AppState>,
    RequireOwner(identity): RequireOwner,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<Value>> {
    if params.period == 0 || params.period > 365 {
        return Err(AppError::BadRequest(
            "period must be between 1 and 365 days".to_owned(),
        ));
    }

    let store = owned_store(&state, identity).await?;

    let now = Utc::now();
    let period = Duration::days(i64::from(params.period));
    // Fetch both comparison windows in one pass.
    let events = state
        .store()
        .ratings_created_since(store.id, now - period - period)
        .await?;

    let current_window: Vec<RatingEvent> = events
        .iter()
        .filter(|e| e.created_at >= now - period)
        .copied()
        .collect();
    let over_time = analytics::ratings_over_time(&current_window);
    let trends = analytics::period_comparison(&events, now, params.period);

    Ok(Json(json!({
        "store_name": store.name,
        "period_days": params.period,
        "ratings_over_time": over_time,
        "trends": trends,
    })))
}
