//! In-memory backend for [`RatingStore`].
//!
//! Holds the whole relational state behind one async `RwLock`, which makes
//! every mutation an atomic unit: the rating write and the summary
//! recomputation happen under the same write guard, so concurrent callers
//! serialize exactly like transactions against the `PostgreSQL` backend.
//! The `(user, store)` map key plays the role of the unique index.
//!
//! Used by the test suites, the seed command, and `STORERATE_BACKEND=memory`
//! development mode.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use storerate_core::{Email, RatingId, Role, Score, StoreId, UserId};

use crate::models::{
    Page, Pagination, Rating, RatingEvent, RatingWithRater, RatingWithStore, Store, StoreSummary,
    StoreWithViewerRating, User,
};

use super::{
    ModifiedRating, NewStore, NewUser, PlatformStats, ProfileUpdate, RatingStore, SortOrder,
    StoreError, StoreQuery, StoreSortField, StoreUpdate, UserQuery, UserSortField, UserUpdate,
};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, UserRecord>,
    stores: HashMap<StoreId, Store>,
    ratings: HashMap<(UserId, StoreId), Rating>,
    next_user: i32,
    next_store: i32,
    next_rating: i32,
}

impl Inner {
    fn scores_for(&self, store_id: StoreId) -> Vec<Score> {
        self.ratings
            .values()
            .filter(|r| r.store_id == store_id)
            .map(|r| r.score)
            .collect()
    }

    /// Recompute the summary over the live rating rows, mirroring the SQL
    /// backend's COUNT/AVG re-aggregation.
    fn recompute_summary(&mut self, store_id: StoreId) -> Result<StoreSummary, StoreError> {
        let summary = StoreSummary::compute(&self.scores_for(store_id));
        let store = self
            .stores
            .get_mut(&store_id)
            .ok_or(StoreError::StoreNotFound)?;
        store.rating = summary.new_average_rating;
        store.total_ratings = summary.total_ratings;
        store.updated_at = Utc::now();
        Ok(summary)
    }
}

/// In-process storage with the same invariants as the SQL backend.
#[derive(Default)]
pub struct MemRatingStore {
    inner: RwLock<Inner>,
}

impl MemRatingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite an existing rating's creation timestamp.
    ///
    /// Analytics windows are computed over creation timestamps, so tests
    /// and seed data need ratings that look older than the process.
    pub async fn backdate_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let rating = inner
            .ratings
            .get_mut(&(user_id, store_id))
            .ok_or(StoreError::NotRated)?;
        rating.created_at = created_at;
        rating.updated_at = created_at;
        Ok(())
    }
}

fn sort_users(users: &mut [User], field: UserSortField, order: SortOrder) {
    users.sort_by(|a, b| {
        let ordering = match field {
            UserSortField::Name => a.name.cmp(&b.name),
            UserSortField::Email => a.email.as_str().cmp(b.email.as_str()),
            UserSortField::Role => a.role.as_str().cmp(b.role.as_str()),
            UserSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn sort_stores(stores: &mut [StoreWithViewerRating], field: StoreSortField, order: SortOrder) {
    stores.sort_by(|a, b| {
        let ordering = match field {
            StoreSortField::Name => a.name.cmp(&b.name),
            StoreSortField::Email => a.email.as_str().cmp(b.email.as_str()),
            StoreSortField::Address => a.address.cmp(&b.address),
            StoreSortField::Rating => a.rating.total_cmp(&b.rating),
            StoreSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn paginate<T>(mut items: Vec<T>, page: u32, limit: u32) -> Page<T> {
    let total = items.len() as i64;
    // Widened before multiplying; u32 page * u32 limit can overflow.
    let start = usize::try_from(u64::from(page.saturating_sub(1)) * u64::from(limit))
        .unwrap_or(usize::MAX);
    let items = if start >= items.len() {
        Vec::new()
    } else {
        items.drain(start..).take(limit as usize).collect()
    };
    Page {
        items,
        pagination: Pagination::new(page, limit, total),
    }
}

#[async_trait]
impl RatingStore for MemRatingStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|r| r.user.email == new_user.email) {
            return Err(StoreError::EmailTaken);
        }
        inner.next_user += 1;
        let now = Utc::now();
        let user = User {
            id: UserId::new(inner.next_user),
            name: new_user.name,
            email: new_user.email,
            address: new_user.address,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: new_user.password_hash,
            },
        );
        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).map(|r| r.user.clone()))
    }

    async fn user_for_login(&self, email: &Email) -> Result<Option<(User, String)>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|r| r.user.email == *email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner.users.get_mut(&id).ok_or(StoreError::UserNotFound)?;
        record.password_hash = password_hash.to_owned();
        record.user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|r| r.user.id != id && r.user.email == update.email)
        {
            return Err(StoreError::EmailTaken);
        }
        let record = inner.users.get_mut(&id).ok_or(StoreError::UserNotFound)?;
        record.user.name = update.name;
        record.user.email = update.email;
        record.user.address = update.address;
        record.user.role = update.role;
        record.user.updated_at = Utc::now();
        Ok(record.user.clone())
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner.users.get_mut(&id).ok_or(StoreError::UserNotFound)?;
        if let Some(name) = update.name {
            record.user.name = name;
        }
        if let Some(address) = update.address {
            record.user.address = Some(address);
        }
        record.user.updated_at = Utc::now();
        Ok(record.user.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.remove(&id).is_none() {
            return Err(StoreError::UserNotFound);
        }
        // Cascade the user's ratings, then repair every touched summary.
        let affected: Vec<StoreId> = inner
            .ratings
            .values()
            .filter(|r| r.user_id == id)
            .map(|r| r.store_id)
            .collect();
        inner.ratings.retain(|_, r| r.user_id != id);
        for store_id in affected {
            inner.recompute_summary(store_id)?;
        }
        // Disown any store this user owned.
        for store in inner.stores.values_mut() {
            if store.owner_id == Some(id) {
                store.owner_id = None;
            }
        }
        Ok(())
    }

    async fn list_users(&self, query: UserQuery) -> Result<Page<User>, StoreError> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .map(|r| r.user.clone())
            .filter(|u| u.role != Role::Admin)
            .filter(|u| {
                query
                    .name
                    .as_deref()
                    .is_none_or(|needle| contains_ci(&u.name, needle))
            })
            .filter(|u| query.role.is_none_or(|role| u.role == role))
            .collect();
        sort_users(&mut users, query.sort, query.order);
        Ok(paginate(users, query.page, query.limit))
    }

    async fn create_store(&self, new_store: NewStore) -> Result<Store, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.stores.values().any(|s| s.email == new_store.email) {
            return Err(StoreError::EmailTaken);
        }
        if let Some(owner_id) = new_store.owner_id
            && !inner.users.contains_key(&owner_id)
        {
            return Err(StoreError::UserNotFound);
        }
        inner.next_store += 1;
        let now = Utc::now();
        let store = Store {
            id: StoreId::new(inner.next_store),
            name: new_store.name,
            email: new_store.email,
            address: new_store.address,
            owner_id: new_store.owner_id,
            rating: 0.0,
            total_ratings: 0,
            created_at: now,
            updated_at: now,
        };
        inner.stores.insert(store.id, store.clone());
        Ok(store)
    }

    async fn store_by_id(&self, id: StoreId) -> Result<Option<Store>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.stores.get(&id).cloned())
    }

    async fn store_by_owner(&self, owner_id: UserId) -> Result<Option<Store>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .stores
            .values()
            .find(|s| s.owner_id == Some(owner_id))
            .cloned())
    }

    async fn list_stores(
        &self,
        query: StoreQuery,
        viewer: UserId,
    ) -> Result<Page<StoreWithViewerRating>, StoreError> {
        let inner = self.inner.read().await;
        let mut stores: Vec<StoreWithViewerRating> = inner
            .stores
            .values()
            .filter(|s| {
                query
                    .name
                    .as_deref()
                    .is_none_or(|needle| contains_ci(&s.name, needle))
            })
            .filter(|s| {
                query.address.as_deref().is_none_or(|needle| {
                    s.address
                        .as_deref()
                        .is_some_and(|addr| contains_ci(addr, needle))
                })
            })
            .map(|s| StoreWithViewerRating {
                id: s.id,
                name: s.name.clone(),
                email: s.email.clone(),
                address: s.address.clone(),
                rating: s.rating,
                total_ratings: s.total_ratings,
                created_at: s.created_at,
                user_rating: inner.ratings.get(&(viewer, s.id)).map(|r| r.score),
            })
            .collect();
        sort_stores(&mut stores, query.sort, query.order);
        Ok(paginate(stores, query.page, query.limit))
    }

    async fn update_store(&self, id: StoreId, update: StoreUpdate) -> Result<Store, StoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .stores
            .values()
            .any(|s| s.id != id && s.email == update.email)
        {
            return Err(StoreError::EmailTaken);
        }
        let store = inner.stores.get_mut(&id).ok_or(StoreError::StoreNotFound)?;
        store.name = update.name;
        store.email = update.email;
        store.address = update.address;
        store.updated_at = Utc::now();
        Ok(store.clone())
    }

    async fn delete_store(&self, id: StoreId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.stores.remove(&id).is_none() {
            return Err(StoreError::StoreNotFound);
        }
        inner.ratings.retain(|_, r| r.store_id != id);
        Ok(())
    }

    async fn submit_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        score: Score,
    ) -> Result<(Rating, StoreSummary), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.stores.contains_key(&store_id) {
            return Err(StoreError::StoreNotFound);
        }
        if inner.ratings.contains_key(&(user_id, store_id)) {
            return Err(StoreError::AlreadyRated);
        }
        inner.next_rating += 1;
        let now = Utc::now();
        let rating = Rating {
            id: RatingId::new(inner.next_rating),
            user_id,
            store_id,
            score,
            created_at: now,
            updated_at: now,
        };
        inner.ratings.insert((user_id, store_id), rating.clone());
        let summary = inner.recompute_summary(store_id)?;
        Ok((rating, summary))
    }

    async fn modify_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        score: Score,
    ) -> Result<(ModifiedRating, StoreSummary), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.stores.contains_key(&store_id) {
            return Err(StoreError::StoreNotFound);
        }
        let rating = {
            let entry = inner
                .ratings
                .get_mut(&(user_id, store_id))
                .ok_or(StoreError::NotRated)?;
            let old_score = entry.score;
            entry.score = score;
            entry.updated_at = Utc::now();
            ModifiedRating {
                rating: entry.clone(),
                old_score,
            }
        };
        let summary = inner.recompute_summary(store_id)?;
        Ok((rating, summary))
    }

    async fn delete_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<(Rating, StoreSummary), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.stores.contains_key(&store_id) {
            return Err(StoreError::StoreNotFound);
        }
        let rating = inner
            .ratings
            .remove(&(user_id, store_id))
            .ok_or(StoreError::NotRated)?;
        let summary = inner.recompute_summary(store_id)?;
        Ok((rating, summary))
    }

    async fn rating_for(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Option<Rating>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.ratings.get(&(user_id, store_id)).cloned())
    }

    async fn ratings_by_user(
        &self,
        user_id: UserId,
        page: u32,
        limit: u32,
    ) -> Result<Page<RatingWithStore>, StoreError> {
        let inner = self.inner.read().await;
        let mut ratings: Vec<RatingWithStore> = inner
            .ratings
            .values()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                inner.stores.get(&r.store_id).map(|s| RatingWithStore {
                    id: r.id,
                    score: r.score,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                    store_id: s.id,
                    store_name: s.name.clone(),
                    store_address: s.address.clone(),
                    store_avg_rating: s.rating,
                })
            })
            .collect();
        ratings.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(paginate(ratings, page, limit))
    }

    async fn ratings_for_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<RatingWithRater>, StoreError> {
        let inner = self.inner.read().await;
        let mut ratings: Vec<RatingWithRater> = inner
            .ratings
            .values()
            .filter(|r| r.store_id == store_id)
            .filter_map(|r| {
                inner.users.get(&r.user_id).map(|record| RatingWithRater {
                    id: r.id,
                    score: r.score,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                    user_id: record.user.id,
                    user_name: record.user.name.clone(),
                    user_email: record.user.email.clone(),
                    user_address: record.user.address.clone(),
                })
            })
            .collect();
        ratings.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(ratings)
    }

    async fn ratings_created_since(
        &self,
        store_id: StoreId,
        since: DateTime<Utc>,
    ) -> Result<Vec<RatingEvent>, StoreError> {
        let inner = self.inner.read().await;
        let mut events: Vec<RatingEvent> = inner
            .ratings
            .values()
            .filter(|r| r.store_id == store_id && r.created_at >= since)
            .map(|r| RatingEvent {
                score: r.score,
                created_at: r.created_at,
            })
            .collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    async fn platform_stats(&self) -> Result<PlatformStats, StoreError> {
        let inner = self.inner.read().await;
        Ok(PlatformStats {
            total_users: inner
                .users
                .values()
                .filter(|r| r.user.role != Role::Admin)
                .count() as i64,
            total_stores: inner.stores.len() as i64,
            total_ratings: inner.ratings.len() as i64,
        })
    }

    async fn recent_users(&self, limit: u32) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .map(|r| r.user.clone())
            .filter(|u| u.role != Role::Admin)
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users.truncate(limit as usize);
        Ok(users)
    }

    async fn recent_stores(&self, limit: u32) -> Result<Vec<Store>, StoreError> {
        let inner = self.inner.read().await;
        let mut stores: Vec<Store> = inner.stores.values().cloned().collect();
        stores.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        stores.truncate(limit as usize);
        Ok(stores)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn seed_user(store: &MemRatingStore, email: &str, role: Role) -> User {
        store
            .create_user(NewUser {
                name: format!("Account For {email}"),
                email: Email::parse(email).unwrap(),
                password_hash: "hash".to_owned(),
                address: None,
                role,
            })
            .await
            .unwrap()
    }

    async fn seed_store(store: &MemRatingStore, email: &str) -> Store {
        store
            .create_store(NewStore {
                name: "Corner Shop".to_owned(),
                email: Email::parse(email).unwrap(),
                address: Some("1 Main St".to_owned()),
                owner_id: None,
            })
            .await
            .unwrap()
    }

    fn score(v: i32) -> Score {
        Score::new(v).unwrap()
    }

    #[tokio::test]
    async fn test_submit_updates_summary() {
        let backend = MemRatingStore::new();
        let user = seed_user(&backend, "u1@example.com", Role::User).await;
        let shop = seed_store(&backend, "s1@example.com").await;

        let (rating, summary) = backend
            .submit_rating(user.id, shop.id, score(4))
            .await
            .unwrap();
        assert_eq!(rating.score, score(4));
        assert_eq!(summary.total_ratings, 1);
        assert!((summary.new_average_rating - 4.0).abs() < 1e-9);

        let stored = backend.store_by_id(shop.id).await.unwrap().unwrap();
        assert_eq!(stored.total_ratings, 1);
    }

    #[tokio::test]
    async fn test_duplicate_submit_rejected_and_state_unchanged() {
        let backend = MemRatingStore::new();
        let user = seed_user(&backend, "u1@example.com", Role::User).await;
        let shop = seed_store(&backend, "s1@example.com").await;

        backend
            .submit_rating(user.id, shop.id, score(5))
            .await
            .unwrap();
        let err = backend
            .submit_rating(user.id, shop.id, score(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyRated));

        let stored = backend.store_by_id(shop.id).await.unwrap().unwrap();
        assert_eq!(stored.total_ratings, 1);
        assert!((stored.rating - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_modify_without_rating_is_not_rated() {
        let backend = MemRatingStore::new();
        let user = seed_user(&backend, "u1@example.com", Role::User).await;
        let shop = seed_store(&backend, "s1@example.com").await;

        let err = backend
            .modify_rating(user.id, shop.id, score(3))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotRated));
        let err = backend.delete_rating(user.id, shop.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotRated));
    }

    #[tokio::test]
    async fn test_modify_preserves_creation_timestamp() {
        let backend = MemRatingStore::new();
        let user = seed_user(&backend, "u1@example.com", Role::User).await;
        let shop = seed_store(&backend, "s1@example.com").await;

        let (submitted, _) = backend
            .submit_rating(user.id, shop.id, score(4))
            .await
            .unwrap();
        let (modified, summary) = backend
            .modify_rating(user.id, shop.id, score(2))
            .await
            .unwrap();

        assert_eq!(modified.old_score, score(4));
        assert_eq!(modified.rating.score, score(2));
        assert_eq!(modified.rating.created_at, submitted.created_at);
        assert!(modified.rating.updated_at >= submitted.updated_at);
        assert_eq!(summary.total_ratings, 1);
        assert!((summary.new_average_rating - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_delete_last_rating_resets_to_zero() {
        let backend = MemRatingStore::new();
        let user = seed_user(&backend, "u1@example.com", Role::User).await;
        let shop = seed_store(&backend, "s1@example.com").await;

        backend
            .submit_rating(user.id, shop.id, score(3))
            .await
            .unwrap();
        let (_, summary) = backend.delete_rating(user.id, shop.id).await.unwrap();
        assert_eq!(summary, StoreSummary::EMPTY);

        let stored = backend.store_by_id(shop.id).await.unwrap().unwrap();
        assert_eq!(stored.total_ratings, 0);
        assert!((stored.rating - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_aggregate_over_multiple_raters() {
        let backend = MemRatingStore::new();
        let shop = seed_store(&backend, "s1@example.com").await;
        let mut raters = Vec::new();
        for (i, v) in [5, 4, 5, 3].iter().enumerate() {
            let user = seed_user(&backend, &format!("u{i}@example.com"), Role::User).await;
            backend
                .submit_rating(user.id, shop.id, score(*v))
                .await
                .unwrap();
            raters.push(user);
        }

        let stored = backend.store_by_id(shop.id).await.unwrap().unwrap();
        assert_eq!(stored.total_ratings, 4);
        assert!((stored.rating - 4.25).abs() < 1e-9);

        // The user who gave the 3 deletes it: mean becomes 14/3.
        let (_, summary) = backend
            .delete_rating(raters[3].id, shop.id)
            .await
            .unwrap();
        assert_eq!(summary.total_ratings, 3);
        assert!((summary.new_average_rating - 14.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_delete_user_cascades_and_repairs_summary() {
        let backend = MemRatingStore::new();
        let rater = seed_user(&backend, "u1@example.com", Role::User).await;
        let other = seed_user(&backend, "u2@example.com", Role::User).await;
        let shop = seed_store(&backend, "s1@example.com").await;

        backend
            .submit_rating(rater.id, shop.id, score(1))
            .await
            .unwrap();
        backend
            .submit_rating(other.id, shop.id, score(5))
            .await
            .unwrap();

        backend.delete_user(rater.id).await.unwrap();

        let stored = backend.store_by_id(shop.id).await.unwrap().unwrap();
        assert_eq!(stored.total_ratings, 1);
        assert!((stored.rating - 5.0).abs() < 1e-9);
        assert!(
            backend
                .rating_for(rater.id, shop.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_concurrent_submit_race_single_winner() {
        let backend = std::sync::Arc::new(MemRatingStore::new());
        let user = seed_user(&backend, "u1@example.com", Role::User).await;
        let shop = seed_store(&backend, "s1@example.com").await;

        let a = {
            let backend = std::sync::Arc::clone(&backend);
            tokio::spawn(async move { backend.submit_rating(user.id, shop.id, score(5)).await })
        };
        let b = {
            let backend = std::sync::Arc::clone(&backend);
            tokio::spawn(async move { backend.submit_rating(user.id, shop.id, score(1)).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(
            usize::from(a.is_ok()) + usize::from(b.is_ok()),
            1,
            "exactly one submit must win"
        );

        let stored = backend.store_by_id(shop.id).await.unwrap().unwrap();
        assert_eq!(stored.total_ratings, 1);
    }

    #[tokio::test]
    async fn test_list_stores_includes_viewer_rating_flags() {
        let backend = MemRatingStore::new();
        let user = seed_user(&backend, "u1@example.com", Role::User).await;
        let rated = seed_store(&backend, "s1@example.com").await;
        let _unrated = seed_store(&backend, "s2@example.com").await;

        backend
            .submit_rating(user.id, rated.id, score(4))
            .await
            .unwrap();

        let page = backend
            .list_stores(
                StoreQuery {
                    page: 1,
                    limit: 10,
                    ..StoreQuery::default()
                },
                user.id,
            )
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        let rated_row = page.items.iter().find(|s| s.id == rated.id).unwrap();
        assert_eq!(rated_row.user_rating, Some(score(4)));
        let unrated_row = page.items.iter().find(|s| s.id != rated.id).unwrap();
        assert_eq!(unrated_row.user_rating, None);
    }

    #[tokio::test]
    async fn test_pagination_window() {
        let backend = MemRatingStore::new();
        let viewer = seed_user(&backend, "viewer@example.com", Role::User).await;
        for i in 0..25 {
            seed_store(&backend, &format!("s{i}@example.com")).await;
        }

        let page = backend
            .list_stores(
                StoreQuery {
                    sort: StoreSortField::Email,
                    page: 3,
                    limit: 10,
                    ..StoreQuery::default()
                },
                viewer.id,
            )
            .await
            .unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.pagination.total, 25);
        assert_eq!(page.pagination.pages, 3);
    }

    #[test]
    fn test_pagination_huge_page_number_is_empty() {
        // u32::MAX * 100 overflows u32; the offset math must not.
        let page = paginate((1..=5).collect::<Vec<i32>>(), u32::MAX, 100);
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total, 5);
    }

    #[tokio::test]
    async fn test_update_store_preserves_summary() {
        let backend = MemRatingStore::new();
        let user = seed_user(&backend, "u1@example.com", Role::User).await;
        let shop = seed_store(&backend, "s1@example.com").await;
        backend
            .submit_rating(user.id, shop.id, score(4))
            .await
            .unwrap();

        let updated = backend
            .update_store(
                shop.id,
                StoreUpdate {
                    name: "Renamed Shop".to_owned(),
                    email: Email::parse("renamed@example.com").unwrap(),
                    address: Some("2 Side St".to_owned()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed Shop");
        assert_eq!(updated.total_ratings, 1);
        assert!((updated.rating - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_update_store_rejects_taken_email() {
        let backend = MemRatingStore::new();
        let shop = seed_store(&backend, "s1@example.com").await;
        seed_store(&backend, "s2@example.com").await;

        let err = backend
            .update_store(
                shop.id,
                StoreUpdate {
                    name: "Corner Shop".to_owned(),
                    email: Email::parse("s2@example.com").unwrap(),
                    address: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
    }

    #[tokio::test]
    async fn test_update_profile_partial_fields() {
        let backend = MemRatingStore::new();
        let user = seed_user(&backend, "u1@example.com", Role::User).await;

        let updated = backend
            .update_profile(
                user.id,
                ProfileUpdate {
                    name: None,
                    address: Some("9 New Lane".to_owned()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, user.name);
        assert_eq!(updated.address.as_deref(), Some("9 New Lane"));
    }
}
