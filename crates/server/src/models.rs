//! Domain models shared between the storage backends and the API layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use storerate_core::{Email, RatingId, Role, Score, StoreId, UserId};

/// An account: administrator, end-user, or store owner.
///
/// The password hash never leaves the storage layer; login goes through
/// [`crate::store::RatingStore::user_for_login`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A rated store.
///
/// `rating` and `total_ratings` are a denormalized summary of the live
/// rating rows for this store. They are recomputed from scratch inside the
/// same transaction as every rating mutation, never patched incrementally.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
    /// Owning user, if any. Admin-created stores may be ownerless.
    pub owner_id: Option<UserId>,
    /// Mean of all rating scores, 0.0 when the store has none.
    pub rating: f64,
    /// Count of rating rows for this store.
    pub total_ratings: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One user's rating of one store. At most one row exists per
/// (user, store) pair; the storage layer enforces the uniqueness.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Rating {
    pub id: RatingId,
    pub user_id: UserId,
    pub store_id: StoreId,
    #[serde(rename = "rating")]
    pub score: Score,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The refreshed aggregate returned alongside every rating mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StoreSummary {
    pub new_average_rating: f64,
    pub total_ratings: i32,
}

impl StoreSummary {
    /// The defined empty state: zero ratings average to 0.0, not NULL.
    pub const EMPTY: Self = Self {
        new_average_rating: 0.0,
        total_ratings: 0,
    };

    /// Recompute the aggregate over the given scores.
    ///
    /// Full re-aggregation over the live rows, so repeated application
    /// converges to the same value regardless of mutation order.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn compute(scores: &[Score]) -> Self {
        if scores.is_empty() {
            return Self::EMPTY;
        }
        let total: f64 = scores.iter().map(Score::as_f64).sum();
        Self {
            new_average_rating: total / scores.len() as f64,
            total_ratings: scores.len() as i32,
        }
    }
}

/// A store row joined with the viewing user's own rating, for listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoreWithViewerRating {
    pub id: StoreId,
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
    pub rating: f64,
    pub total_ratings: i32,
    pub created_at: DateTime<Utc>,
    /// The viewer's own score for this store, if they rated it.
    pub user_rating: Option<Score>,
}

/// A rating joined with its store, for "my ratings" listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RatingWithStore {
    pub id: RatingId,
    #[serde(rename = "rating")]
    pub score: Score,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub store_id: StoreId,
    pub store_name: String,
    pub store_address: Option<String>,
    pub store_avg_rating: f64,
}

/// A rating joined with its rater, for the owner dashboard.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RatingWithRater {
    pub id: RatingId,
    #[serde(rename = "rating")]
    pub score: Score,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: Email,
    pub user_address: Option<String>,
}

/// Minimal rating record used by the analytics computations: when the
/// rating was created and what score it carries.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct RatingEvent {
    pub score: Score,
    pub created_at: DateTime<Utc>,
}

impl RatingEvent {
    /// Calendar date of creation (UTC).
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// Pagination metadata attached to every list response.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: u32,
}

impl Pagination {
    /// Build pagination metadata from the request window and total count.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            (total as u64).div_ceil(u64::from(limit)) as u32
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// A page of items plus its pagination metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
