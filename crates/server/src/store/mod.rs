//! Storage seam for users, stores, and ratings.
//!
//! [`RatingStore`] is the persistence contract for the whole relational
//! state: account rows, store rows, rating rows, and the denormalized
//! per-store aggregate. Two backends implement it:
//!
//! - [`PgRatingStore`] - `PostgreSQL` via `sqlx`, the production backend
//! - [`MemRatingStore`] - in-process maps, used by tests, seeding, and
//!   `STORERATE_BACKEND=memory` development mode
//!
//! Both enforce the same invariants: at most one rating per (user, store)
//! pair, rejected by the storage layer itself (unique index / map key), and
//! a store summary that always equals the aggregate over live rating rows.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use storerate_core::{Email, Role, Score, StoreId, UserId};

use crate::models::{
    Page, Rating, RatingEvent, RatingWithRater, RatingWithStore, Store, StoreSummary,
    StoreWithViewerRating, User,
};

pub use memory::MemRatingStore;
pub use postgres::PgRatingStore;

/// Errors surfaced by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A rating for this (user, store) pair already exists.
    #[error("rating already exists for this user and store")]
    AlreadyRated,

    /// No rating exists for this (user, store) pair.
    #[error("no rating exists for this user and store")]
    NotRated,

    /// The referenced store does not exist.
    #[error("store not found")]
    StoreNotFound,

    /// The referenced user does not exist.
    #[error("user not found")]
    UserNotFound,

    /// A unique email constraint was violated.
    #[error("email already in use")]
    EmailTaken,

    /// The uniqueness constraint fired despite a passed existence check:
    /// a concurrent writer won the race.
    #[error("conflicting concurrent write")]
    Conflict,

    /// The underlying store failed; nothing was written.
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

/// New-user payload for [`RatingStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub address: Option<String>,
    pub role: Role,
}

/// Admin-editable user fields for [`RatingStore::update_user`].
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
    pub role: Role,
}

/// Self-service profile fields for [`RatingStore::update_profile`].
/// `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
}

impl ProfileUpdate {
    /// True when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none()
    }
}

/// New-store payload for [`RatingStore::create_store`].
#[derive(Debug, Clone)]
pub struct NewStore {
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
    pub owner_id: Option<UserId>,
}

/// Admin-editable store fields for [`RatingStore::update_store`].
#[derive(Debug, Clone)]
pub struct StoreUpdate {
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
}

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse `asc`/`desc` (case-insensitive), defaulting to ascending.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    /// SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Whitelisted sort fields for store listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreSortField {
    #[default]
    Name,
    Email,
    Address,
    Rating,
    CreatedAt,
}

impl StoreSortField {
    /// Parse a sort field name, falling back to `Name` for anything
    /// outside the whitelist. Never interpolates caller input into SQL.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "email" => Self::Email,
            "address" => Self::Address,
            "rating" => Self::Rating,
            "created_at" => Self::CreatedAt,
            _ => Self::Name,
        }
    }

    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Address => "address",
            Self::Rating => "rating",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Whitelisted sort fields for user listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortField {
    #[default]
    Name,
    Email,
    Role,
    CreatedAt,
}

impl UserSortField {
    /// Parse a sort field name, falling back to `Name` for anything
    /// outside the whitelist.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "email" => Self::Email,
            "role" => Self::Role,
            "created_at" => Self::CreatedAt,
            _ => Self::Name,
        }
    }

    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Role => "role",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Filter/sort/pagination parameters for store listings.
#[derive(Debug, Clone, Default)]
pub struct StoreQuery {
    /// Case-insensitive substring match on the store name.
    pub name: Option<String>,
    /// Case-insensitive substring match on the address.
    pub address: Option<String>,
    pub sort: StoreSortField,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

/// Filter/sort/pagination parameters for user listings.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// Case-insensitive substring match on the user name.
    pub name: Option<String>,
    pub role: Option<Role>,
    pub sort: UserSortField,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

/// A modified rating: the overwritten and the new score.
#[derive(Debug, Clone)]
pub struct ModifiedRating {
    pub rating: Rating,
    pub old_score: Score,
}

/// Platform-wide counters for the admin dashboard.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PlatformStats {
    /// Non-admin accounts.
    pub total_users: i64,
    pub total_stores: i64,
    pub total_ratings: i64,
}

/// Persistence contract for the relational state.
///
/// Mutating rating operations are atomic units: existence/uniqueness
/// validation, the rating write, and the summary recomputation either all
/// take effect or none do. A reader never observes a store summary computed
/// from a partially applied write.
#[async_trait]
pub trait RatingStore: Send + Sync {
    // --- Users ---

    /// Insert a user. Fails with `EmailTaken` if the email is in use.
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Fetch a user by id.
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Fetch a user plus their password hash for credential verification.
    async fn user_for_login(&self, email: &Email) -> Result<Option<(User, String)>, StoreError>;

    /// Replace a user's password hash.
    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), StoreError>;

    /// Overwrite a user's editable fields. Fails with `UserNotFound` or
    /// `EmailTaken`.
    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, StoreError>;

    /// Apply a partial self-service profile update (name and/or address).
    /// Fails with `UserNotFound`.
    async fn update_profile(&self, id: UserId, update: ProfileUpdate)
    -> Result<User, StoreError>;

    /// Delete a user, cascading their ratings and recomputing every store
    /// summary the cascade touched.
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError>;

    /// List users with filtering, whitelisted sorting, and pagination.
    async fn list_users(&self, query: UserQuery) -> Result<Page<User>, StoreError>;

    // --- Stores ---

    /// Insert a store. Fails with `EmailTaken` if the email is in use, or
    /// `UserNotFound` if `owner_id` references a missing user.
    async fn create_store(&self, new_store: NewStore) -> Result<Store, StoreError>;

    /// Fetch a store by id.
    async fn store_by_id(&self, id: StoreId) -> Result<Option<Store>, StoreError>;

    /// Fetch the store owned by the given user, if any.
    async fn store_by_owner(&self, owner_id: UserId) -> Result<Option<Store>, StoreError>;

    /// Overwrite a store's editable fields. The cached rating summary is
    /// untouched. Fails with `StoreNotFound` or `EmailTaken`.
    async fn update_store(&self, id: StoreId, update: StoreUpdate) -> Result<Store, StoreError>;

    /// List stores joined with the viewer's own rating per row.
    async fn list_stores(
        &self,
        query: StoreQuery,
        viewer: UserId,
    ) -> Result<Page<StoreWithViewerRating>, StoreError>;

    /// Delete a store, cascading its ratings.
    async fn delete_store(&self, id: StoreId) -> Result<(), StoreError>;

    // --- Ratings ---

    /// Insert a new rating and recompute the store summary, atomically.
    ///
    /// Fails with `StoreNotFound` if the store is missing, `AlreadyRated`
    /// if a row for the pair exists, or `Conflict` if a concurrent submit
    /// won the uniqueness race after the existence pre-check passed.
    async fn submit_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        score: Score,
    ) -> Result<(Rating, StoreSummary), StoreError>;

    /// Overwrite an existing rating's score (creation timestamp is
    /// preserved, update timestamp bumped) and recompute the summary.
    ///
    /// Fails with `NotRated` if no rating exists for the pair; submit and
    /// modify are deliberately distinct operations, not an upsert.
    async fn modify_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        score: Score,
    ) -> Result<(ModifiedRating, StoreSummary), StoreError>;

    /// Remove a rating and recompute the summary (0/0 when none remain).
    ///
    /// Fails with `NotRated` if no rating exists for the pair.
    async fn delete_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<(Rating, StoreSummary), StoreError>;

    /// Fetch one user's rating of one store.
    async fn rating_for(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Option<Rating>, StoreError>;

    /// Page through a user's ratings, newest update first, joined with
    /// store info.
    async fn ratings_by_user(
        &self,
        user_id: UserId,
        page: u32,
        limit: u32,
    ) -> Result<Page<RatingWithStore>, StoreError>;

    /// All ratings for a store joined with rater info, newest update first.
    async fn ratings_for_store(&self, store_id: StoreId)
    -> Result<Vec<RatingWithRater>, StoreError>;

    /// Rating creation events for a store on or after `since`, for the
    /// analytics computations. Read-only; creation timestamps, not update
    /// timestamps.
    async fn ratings_created_since(
        &self,
        store_id: StoreId,
        since: DateTime<Utc>,
    ) -> Result<Vec<RatingEvent>, StoreError>;

    // --- Dashboard reads ---

    /// Platform-wide totals (users excluding admins, stores, ratings).
    async fn platform_stats(&self) -> Result<PlatformStats, StoreError>;

    /// Most recently created non-admin users.
    async fn recent_users(&self, limit: u32) -> Result<Vec<User>, StoreError>;

    /// Most recently created stores.
    async fn recent_stores(&self, limit: u32) -> Result<Vec<Store>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("DESC"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("sideways"), SortOrder::Asc);
    }

    #[test]
    fn test_sort_field_whitelist() {
        assert_eq!(StoreSortField::parse("rating"), StoreSortField::Rating);
        // Injection attempts fall back to the default field
        assert_eq!(
            StoreSortField::parse("name; DROP TABLE stores"),
            StoreSortField::Name
        );
        assert_eq!(UserSortField::parse("role"), UserSortField::Role);
        assert_eq!(UserSortField::parse("password"), UserSortField::Name);
    }
}
