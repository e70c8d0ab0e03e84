//! `PostgreSQL` backend for [`RatingStore`].
//!
//! Every rating mutation runs inside a single transaction that locks the
//! parent store row (`SELECT ... FOR UPDATE`), writes the rating, and
//! recomputes the store summary from the live rows before committing.
//! The lock serializes concurrent mutations against the same store, so the
//! committed summary always matches the committed rating set. The
//! `UNIQUE (user_id, store_id)` index is the authority for the
//! one-rating-per-pair invariant; the existence pre-checks only exist to
//! produce friendly errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder, Row, Transaction};

use storerate_core::{Email, Score, StoreId, UserId};

use crate::models::{
    Page, Pagination, Rating, RatingEvent, RatingWithRater, RatingWithStore, Store, StoreSummary,
    StoreWithViewerRating, User,
};

use super::{
    ModifiedRating, NewStore, NewUser, PlatformStats, ProfileUpdate, RatingStore, StoreError,
    StoreQuery, StoreUpdate, UserQuery, UserUpdate,
};

const USER_COLUMNS: &str = "id, name, email, address, role, created_at, updated_at";
const STORE_COLUMNS: &str =
    "id, name, email, address, owner_id, rating, total_ratings, created_at, updated_at";
const RATING_COLUMNS: &str = "id, user_id, store_id, rating AS score, created_at, updated_at";

/// `PostgreSQL`-backed storage.
#[derive(Clone)]
pub struct PgRatingStore {
    pool: PgPool,
}

/// Internal row type joining a user with their password hash.
#[derive(sqlx::FromRow)]
struct UserAuthRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

impl PgRatingStore {
    /// Create a new `PostgreSQL` backend over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the store row for the duration of the transaction and confirm
    /// it exists. The lock serializes summary recomputation across
    /// concurrent mutations of the same store.
    async fn lock_store(
        tx: &mut Transaction<'_, Postgres>,
        store_id: StoreId,
    ) -> Result<(), StoreError> {
        let row = sqlx::query("SELECT id FROM stores WHERE id = $1 FOR UPDATE")
            .bind(store_id)
            .fetch_optional(&mut **tx)
            .await?;
        if row.is_none() {
            return Err(StoreError::StoreNotFound);
        }
        Ok(())
    }

    /// Recompute and persist the store summary from the live rating rows.
    ///
    /// Full re-aggregation, not an incremental adjustment: one COUNT/AVG
    /// per mutation buys immunity to ordering and floating-point drift.
    async fn recompute_summary(
        tx: &mut Transaction<'_, Postgres>,
        store_id: StoreId,
    ) -> Result<StoreSummary, StoreError> {
        let row = sqlx::query(
            r"
            SELECT COALESCE(AVG(rating)::float8, 0) AS avg_rating,
                   COUNT(*)::int AS total_ratings
            FROM ratings
            WHERE store_id = $1
            ",
        )
        .bind(store_id)
        .fetch_one(&mut **tx)
        .await?;

        let summary = StoreSummary {
            new_average_rating: row.try_get("avg_rating")?,
            total_ratings: row.try_get("total_ratings")?,
        };

        sqlx::query("UPDATE stores SET rating = $1, total_ratings = $2, updated_at = NOW() WHERE id = $3")
            .bind(summary.new_average_rating)
            .bind(summary.total_ratings)
            .bind(store_id)
            .execute(&mut **tx)
            .await?;

        Ok(summary)
    }

    /// Append `ILIKE` substring filters shared by the list queries.
    fn push_store_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a StoreQuery) {
        if let Some(name) = &query.name {
            builder.push(" AND s.name ILIKE ");
            builder.push_bind(format!("%{name}%"));
        }
        if let Some(address) = &query.address {
            builder.push(" AND s.address ILIKE ");
            builder.push_bind(format!("%{address}%"));
        }
    }

    fn push_user_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a UserQuery) {
        if let Some(name) = &query.name {
            builder.push(" AND name ILIKE ");
            builder.push_bind(format!("%{name}%"));
        }
        if let Some(role) = query.role {
            builder.push(" AND role = ");
            builder.push_bind(role.as_str());
        }
    }
}

/// Map a unique-constraint violation to a domain error, passing every
/// other failure through as `Unavailable`.
fn on_unique(e: sqlx::Error, mapped: StoreError) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return mapped;
    }
    StoreError::Unavailable(e)
}

/// Map a foreign-key violation to a domain error.
fn on_foreign_key(e: sqlx::Error, mapped: StoreError) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return mapped;
    }
    StoreError::Unavailable(e)
}

const fn offset_for(page: u32, limit: u32) -> i64 {
    (page.saturating_sub(1) as i64) * (limit as i64)
}

#[async_trait]
impl RatingStore for PgRatingStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, address, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.address)
        .bind(new_user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| on_unique(e, StoreError::EmailTaken))
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn user_for_login(&self, email: &Email) -> Result<Option<(User, String)>, StoreError> {
        let row = sqlx::query_as::<_, UserAuthRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
                .bind(password_hash)
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound);
        }
        Ok(())
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET name = $1, email = $2, address = $3, role = $4, updated_at = NOW()
             WHERE id = $5
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.address)
        .bind(update.role)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| on_unique(e, StoreError::EmailTaken))?;

        user.ok_or(StoreError::UserNotFound)
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET name = COALESCE($1, name),
                 address = COALESCE($2, address),
                 updated_at = NOW()
             WHERE id = $3
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&update.name)
        .bind(&update.address)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(StoreError::UserNotFound)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Stores whose summaries the cascade will touch, locked up front.
        let affected: Vec<StoreId> = sqlx::query_scalar::<_, StoreId>(
            "SELECT s.id FROM stores s
             WHERE s.id IN (SELECT store_id FROM ratings WHERE user_id = $1)
             FOR UPDATE",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        // Ratings cascade via the FK.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound);
        }

        for store_id in affected {
            Self::recompute_summary(&mut tx, store_id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_users(&self, query: UserQuery) -> Result<Page<User>, StoreError> {
        let mut count_builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE role <> 'admin'");
        Self::push_user_filters(&mut count_builder, &query);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role <> 'admin'"
        ));
        Self::push_user_filters(&mut builder, &query);
        builder.push(format!(
            " ORDER BY {} {} LIMIT ",
            query.sort.as_sql(),
            query.order.as_sql()
        ));
        builder.push_bind(i64::from(query.limit));
        builder.push(" OFFSET ");
        builder.push_bind(offset_for(query.page, query.limit));

        let items = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            pagination: Pagination::new(query.page, query.limit, total),
        })
    }

    async fn create_store(&self, new_store: NewStore) -> Result<Store, StoreError> {
        sqlx::query_as::<_, Store>(&format!(
            "INSERT INTO stores (name, email, address, owner_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(&new_store.name)
        .bind(&new_store.email)
        .bind(&new_store.address)
        .bind(new_store.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::EmailTaken,
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                StoreError::UserNotFound
            }
            _ => StoreError::Unavailable(e),
        })
    }

    async fn store_by_id(&self, id: StoreId) -> Result<Option<Store>, StoreError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(store)
    }

    async fn store_by_owner(&self, owner_id: UserId) -> Result<Option<Store>, StoreError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE owner_id = $1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(store)
    }

    async fn list_stores(
        &self,
        query: StoreQuery,
        viewer: UserId,
    ) -> Result<Page<StoreWithViewerRating>, StoreError> {
        let mut count_builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM stores s WHERE TRUE");
        Self::push_store_filters(&mut count_builder, &query);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT s.id, s.name, s.email, s.address, s.rating, s.total_ratings,
                    s.created_at, r.rating AS user_rating
             FROM stores s
             LEFT JOIN ratings r ON r.store_id = s.id AND r.user_id = ",
        );
        builder.push_bind(viewer);
        builder.push(" WHERE TRUE");
        Self::push_store_filters(&mut builder, &query);
        builder.push(format!(
            " ORDER BY s.{} {} LIMIT ",
            query.sort.as_sql(),
            query.order.as_sql()
        ));
        builder.push_bind(i64::from(query.limit));
        builder.push(" OFFSET ");
        builder.push_bind(offset_for(query.page, query.limit));

        let items = builder
            .build_query_as::<StoreWithViewerRating>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            pagination: Pagination::new(query.page, query.limit, total),
        })
    }

    async fn update_store(&self, id: StoreId, update: StoreUpdate) -> Result<Store, StoreError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "UPDATE stores
             SET name = $1, email = $2, address = $3, updated_at = NOW()
             WHERE id = $4
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.address)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| on_unique(e, StoreError::EmailTaken))?;

        store.ok_or(StoreError::StoreNotFound)
    }

    async fn delete_store(&self, id: StoreId) -> Result<(), StoreError> {
        // Ratings cascade via the FK; no other summary is affected.
        let result = sqlx::query("DELETE FROM stores WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::StoreNotFound);
        }
        Ok(())
    }

    async fn submit_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        score: Score,
    ) -> Result<(Rating, StoreSummary), StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_store(&mut tx, store_id).await?;

        // Pre-check for a friendly error; the unique index is the authority.
        let existing = sqlx::query("SELECT id FROM ratings WHERE user_id = $1 AND store_id = $2")
            .bind(user_id)
            .bind(store_id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(StoreError::AlreadyRated);
        }

        let rating = sqlx::query_as::<_, Rating>(&format!(
            "INSERT INTO ratings (user_id, store_id, rating)
             VALUES ($1, $2, $3)
             RETURNING {RATING_COLUMNS}"
        ))
        .bind(user_id)
        .bind(store_id)
        .bind(score)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| on_unique(e, StoreError::Conflict))?;

        let summary = Self::recompute_summary(&mut tx, store_id).await?;
        tx.commit().await?;

        Ok((rating, summary))
    }

    async fn modify_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        score: Score,
    ) -> Result<(ModifiedRating, StoreSummary), StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_store(&mut tx, store_id).await?;

        let old_score: Option<Score> = sqlx::query_scalar::<_, Score>(
            "SELECT rating FROM ratings WHERE user_id = $1 AND store_id = $2",
        )
        .bind(user_id)
        .bind(store_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(old_score) = old_score else {
            return Err(StoreError::NotRated);
        };

        let rating = sqlx::query_as::<_, Rating>(&format!(
            "UPDATE ratings SET rating = $1, updated_at = NOW()
             WHERE user_id = $2 AND store_id = $3
             RETURNING {RATING_COLUMNS}"
        ))
        .bind(score)
        .bind(user_id)
        .bind(store_id)
        .fetch_one(&mut *tx)
        .await?;

        let summary = Self::recompute_summary(&mut tx, store_id).await?;
        tx.commit().await?;

        Ok((ModifiedRating { rating, old_score }, summary))
    }

    async fn delete_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<(Rating, StoreSummary), StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_store(&mut tx, store_id).await?;

        let rating = sqlx::query_as::<_, Rating>(&format!(
            "DELETE FROM ratings WHERE user_id = $1 AND store_id = $2
             RETURNING {RATING_COLUMNS}"
        ))
        .bind(user_id)
        .bind(store_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(rating) = rating else {
            return Err(StoreError::NotRated);
        };

        let summary = Self::recompute_summary(&mut tx, store_id).await?;
        tx.commit().await?;

        Ok((rating, summary))
    }

    async fn rating_for(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Option<Rating>, StoreError> {
        let rating = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE user_id = $1 AND store_id = $2"
        ))
        .bind(user_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn ratings_by_user(
        &self,
        user_id: UserId,
        page: u32,
        limit: u32,
    ) -> Result<Page<RatingWithStore>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, RatingWithStore>(
            "SELECT r.id, r.rating AS score, r.created_at, r.updated_at,
                    s.id AS store_id, s.name AS store_name,
                    s.address AS store_address, s.rating AS store_avg_rating
             FROM ratings r
             JOIN stores s ON r.store_id = s.id
             WHERE r.user_id = $1
             ORDER BY r.updated_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(offset_for(page, limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items,
            pagination: Pagination::new(page, limit, total),
        })
    }

    async fn ratings_for_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<RatingWithRater>, StoreError> {
        let ratings = sqlx::query_as::<_, RatingWithRater>(
            "SELECT r.id, r.rating AS score, r.created_at, r.updated_at,
                    u.id AS user_id, u.name AS user_name,
                    u.email AS user_email, u.address AS user_address
             FROM ratings r
             JOIN users u ON r.user_id = u.id
             WHERE r.store_id = $1
             ORDER BY r.updated_at DESC",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn ratings_created_since(
        &self,
        store_id: StoreId,
        since: DateTime<Utc>,
    ) -> Result<Vec<RatingEvent>, StoreError> {
        let events = sqlx::query_as::<_, RatingEvent>(
            "SELECT rating AS score, created_at
             FROM ratings
             WHERE store_id = $1 AND created_at >= $2
             ORDER BY created_at ASC",
        )
        .bind(store_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn platform_stats(&self) -> Result<PlatformStats, StoreError> {
        let total_users: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role <> 'admin'")
                .fetch_one(&self.pool)
                .await?;
        let total_stores: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
            .fetch_one(&self.pool)
            .await?;
        let total_ratings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings")
            .fetch_one(&self.pool)
            .await?;

        Ok(PlatformStats {
            total_users,
            total_stores,
            total_ratings,
        })
    }

    async fn recent_users(&self, limit: u32) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role <> 'admin'
             ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn recent_stores(&self, limit: u32) -> Result<Vec<Store>, StoreError> {
        let stores = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(stores)
    }
}
