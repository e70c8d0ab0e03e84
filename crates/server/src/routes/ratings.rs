//! Rating submission, modification, and deletion.
//!
//! All three mutations run as one storage transaction that also refreshes
//! the store's cached aggregate, so a client reading the store immediately
//! after a mutation sees the new summary. Submit and modify are deliberately
//! distinct operations, not an upsert: clients branch on "already rated"
//! versus "not rated yet".

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storerate_core::{RatingId, Score, StoreId, UserId};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, RequireRater};
use crate::models::{Page, Rating, StoreSummary};
use crate::state::AppState;

/// Request body shared by submit and modify.
#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub store_id: i32,
    pub rating: i32,
}

/// Response to a successful submit.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub rating: Rating,
    pub store_updated: StoreSummary,
}

/// The mutated-rating part of a modify response: both the score that was
/// replaced and the one that replaced it.
#[derive(Debug, Serialize)]
pub struct ModifyReceipt {
    pub id: RatingId,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub old_rating: Score,
    pub new_rating: Score,
    pub updated_at: DateTime<Utc>,
}

/// Response to a successful modify.
#[derive(Debug, Serialize)]
pub struct ModifyResponse {
    pub message: String,
    pub rating: ModifyReceipt,
    pub store_updated: StoreSummary,
}

/// Response to a successful delete.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted_rating: Rating,
    pub store_updated: StoreSummary,
}

fn parse_score(raw: i32) -> Result<Score> {
    Score::new(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Submit a new rating for a store.
///
/// POST /api/ratings
///
/// # Errors
///
/// Returns 403 for non-rater roles, 400 for an out-of-range score, 404 for
/// an unknown store, and 409 when the caller has already rated the store.
pub async fn submit(
    State(state): State<AppState>,
    RequireRater(identity): RequireRater,
    Json(req): Json<RatingRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    let score = parse_score(req.rating)?;
    let store_id = StoreId::new(req.store_id);

    let (rating, store_updated) = state
        .store()
        .submit_rating(identity.id, store_id, score)
        .await?;

    state.dashboards().invalidate_owner(store_id).await;
    state.dashboards().invalidate_admin().await;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            message: "Rating submitted successfully".to_owned(),
            rating,
            store_updated,
        }),
    ))
}

/// Modify the caller's existing rating for a store.
///
/// PUT /api/ratings
///
/// # Errors
///
/// Returns 404 when the caller has not rated the store yet; otherwise the
/// same failure modes as submit.
pub async fn modify(
    State(state): State<AppState>,
    RequireRater(identity): RequireRater,
    Json(req): Json<RatingRequest>,
) -> Result<Json<ModifyResponse>> {
    let score = parse_score(req.rating)?;
    let store_id = StoreId::new(req.store_id);

    let (modified, store_updated) = state
        .store()
        .modify_rating(identity.id, store_id, score)
        .await?;

    state.dashboards().invalidate_owner(store_id).await;
    state.dashboards().invalidate_admin().await;

    Ok(Json(ModifyResponse {
        message: "Rating updated successfully".to_owned(),
        rating: ModifyReceipt {
            id: modified.rating.id,
            user_id: modified.rating.user_id,
            store_id: modified.rating.store_id,
            old_rating: modified.old_score,
            new_rating: modified.rating.score,
            updated_at: modified.rating.updated_at,
        },
        store_updated,
    }))
}

/// Delete the caller's rating for a store.
///
/// DELETE /api/ratings/{store_id}
///
/// # Errors
///
/// Returns 404 when the caller has not rated the store.
pub async fn remove(
    State(state): State<AppState>,
    RequireRater(identity): RequireRater,
    Path(store_id): Path<i32>,
) -> Result<Json<DeleteResponse>> {
    let store_id = StoreId::new(store_id);

    let (deleted_rating, store_updated) =
        state.store().delete_rating(identity.id, store_id).await?;

    state.dashboards().invalidate_owner(store_id).await;
    state.dashboards().invalidate_admin().await;

    Ok(Json(DeleteResponse {
        message: "Rating deleted successfully".to_owned(),
        deleted_rating,
        store_updated,
    }))
}

/// Pagination parameters for the my-ratings listing.
#[derive(Debug, Deserialize)]
pub struct MyRatingsParams {
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

/// The caller's ratings joined with store info, newest update first.
///
/// GET /api/ratings/my-ratings
///
/// # Errors
///
/// Returns 503 if storage is unavailable.
pub async fn my_ratings(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Query(params): Query<MyRatingsParams>,
) -> Result<Json<serde_json::Value>> {
    let Page { items, pagination } = state
        .store()
        .ratings_by_user(identity.id, params.page.max(1), params.limit.clamp(1, 100))
        .await?;

    Ok(Json(serde_json::json!({
        "ratings": items,
        "pagination": pagination,
    })))
}
