//! Admin API: platform dashboard and account/store management.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use storerate_core::{Email, Role, StoreId, UserId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Page;
use crate::services::auth::{hash_password, validate_address, validate_name, validate_password};
use crate::state::AppState;
use crate::store::{
    NewStore, NewUser, SortOrder, StoreQuery, StoreSortField, StoreUpdate, UserQuery,
    UserSortField, UserUpdate,
};

const RECENT_LIMIT: u32 = 5;
const MAX_STORE_NAME_LENGTH: usize = 60;

/// Platform statistics plus the most recent signups and stores. Cached;
/// every mutation in this module and every rating mutation invalidates it.
///
/// GET /api/admin/dashboard
///
/// # Errors
///
/// Returns 503 if storage is unavailable.
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_identity): RequireAdmin,
) -> Result<Json<Value>> {
    if let Some(snapshot) = state.dashboards().admin_snapshot().await {
        return Ok(Json((*snapshot).clone()));
    }

    let stats = state.store().platform_stats().await?;
    let recent_users = state.store().recent_users(RECENT_LIMIT).await?;
    let recent_stores = state.store().recent_stores(RECENT_LIMIT).await?;

    let snapshot = Arc::new(json!({
        "statistics": stats,
        "recent_activity": {
            "recent_users": recent_users.iter().map(|u| json!({
                "name": u.name,
                "email": u.email,
                "role": u.role,
                "created_at": u.created_at,
            })).collect::<Vec<_>>(),
            "recent_stores": recent_stores.iter().map(|s| json!({
                "name": s.name,
                "email": s.email,
                "rating": s.rating,
                "created_at": s.created_at,
            })).collect::<Vec<_>>(),
        },
    }));

    state
        .dashboards()
        .store_admin_snapshot(Arc::clone(&snapshot))
        .await;

    Ok(Json((*snapshot).clone()))
}

// ============================================================================
// Users
// ============================================================================

/// Query parameters for the user listing.
#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub name: Option<String>,
    pub role: Option<String>,
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

fn parse_role(raw: &str) -> Result<Role> {
    Role::from_str(raw)
        .map_err(|_| AppError::BadRequest("Role must be admin, user, or owner".to_owned()))
}

/// List non-admin accounts with filter, sort, and pagination.
///
/// GET /api/admin/users
///
/// # Errors
///
/// Returns 400 for an unknown role filter.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_identity): RequireAdmin,
    Query(params): Query<UserListParams>,
) -> Result<Json<Value>> {
    let role = params.role.as_deref().map(parse_role).transpose()?;
    let query = UserQuery {
        name: params.name,
        role,
        sort: params
            .sort
            .as_deref()
            .map(UserSortField::parse)
            .unwrap_or_default(),
        order: params
            .order
            .as_deref()
            .map(SortOrder::parse)
            .unwrap_or_default(),
        page: params.page.max(1),
        limit: params.limit.clamp(1, 100),
    };

    let Page { items, pagination } = state.store().list_users(query).await?;

    Ok(Json(json!({
        "users": items,
        "pagination": pagination,
    })))
}

/// Request to create an account with an explicit role.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: Option<String>,
    pub role: Option<String>,
}

/// Create an account; unlike signup, any role may be assigned.
///
/// POST /api/admin/users
///
/// # Errors
///
/// Returns 400 for validation failures and 409 for a duplicate email.
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(_identity): RequireAdmin,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    validate_name(&req.name)?;
    let email = Email::parse(&req.email)
        .map_err(|_| AppError::BadRequest("Please provide a valid email".to_owned()))?;
    validate_password(&req.password)?;
    validate_address(req.address.as_deref())?;
    let role = req.role.as_deref().map_or(Ok(Role::User), parse_role)?;

    let password_hash = hash_password(&req.password)?;
    let user = state
        .store()
        .create_user(NewUser {
            name: req.name,
            email,
            password_hash,
            address: req.address,
            role,
        })
        .await?;

    state.dashboards().invalidate_admin().await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User added successfully",
            "user": user,
        })),
    ))
}

/// Account detail. Owners come with their store summary, raters with their
/// ratings.
///
/// GET /api/admin/users/{id}
///
/// # Errors
///
/// Returns 404 for unknown ids; admin accounts are not exposed here.
pub async fn show_user(
    State(state): State<AppState>,
    RequireAdmin(_identity): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Json<Value>> {
    let user_id = UserId::new(id);
    let user = state
        .store()
        .user_by_id(user_id)
        .await?
        .filter(|u| u.role != Role::Admin)
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;

    let mut body = serde_json::to_value(&user)
        .map_err(|e| AppError::Internal(format!("serialization failed: {e}")))?;

    match user.role {
        Role::Owner => {
            if let Some(store) = state.store().store_by_owner(user_id).await? {
                body["store"] = json!({
                    "id": store.id,
                    "name": store.name,
                    "rating": store.rating,
                    "total_ratings": store.total_ratings,
                });
            }
        }
        Role::User => {
            let ratings = state.store().ratings_by_user(user_id, 1, 100).await?;
            body["ratings"] = json!(
                ratings
                    .items
                    .iter()
                    .map(|r| json!({
                        "rating": r.score,
                        "created_at": r.created_at,
                        "store_name": r.store_name,
                    }))
                    .collect::<Vec<_>>()
            );
        }
        Role::Admin => {}
    }

    Ok(Json(json!({ "user": body })))
}

/// Request to update an account.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub role: String,
}

/// Update an account's profile fields and role.
///
/// PUT /api/admin/users/{id}
///
/// # Errors
///
/// Returns 404 for unknown ids and 409 when the email belongs to another
/// account.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_identity): RequireAdmin,
    Path(id): Path<i32>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<Value>> {
    validate_name(&req.name)?;
    let email = Email::parse(&req.email)
        .map_err(|_| AppError::BadRequest("Please provide a valid email".to_owned()))?;
    validate_address(req.address.as_deref())?;
    let role = parse_role(&req.role)?;

    let user = state
        .store()
        .update_user(
            UserId::new(id),
            UserUpdate {
                name: req.name,
                email,
                address: req.address,
                role,
            },
        )
        .await?;

    state.dashboards().invalidate_admin().await;

    Ok(Json(json!({
        "message": "User updated successfully",
        "user": user,
    })))
}

/// Delete an account. Cascades the account's ratings and repairs every
/// touched store aggregate before returning.
///
/// DELETE /api/admin/users/{id}
///
/// # Errors
///
/// Returns 404 for unknown ids.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(_identity): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Json<Value>> {
    state.store().delete_user(UserId::new(id)).await?;

    // The cascade may have touched any number of store aggregates.
    state.dashboards().invalidate_all();

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

// ============================================================================
// Stores
// ============================================================================

/// Query parameters for the store listing.
#[derive(Debug, Deserialize)]
pub struct AdminStoreListParams {
    pub name: Option<String>,
    pub address: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// List stores with filter, sort, and pagination.
///
/// GET /api/admin/stores
///
/// # Errors
///
/// Returns 503 if storage is unavailable.
pub async fn list_stores(
    State(state): State<AppState>,
    RequireAdmin(identity): RequireAdmin,
    Query(params): Query<AdminStoreListParams>,
) -> Result<Json<Value>> {
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

    // Admins never hold ratings, so the viewer column is always empty.
    let Page { items, pagination } = state.store().list_stores(query, identity.id).await?;

    let stores: Vec<Value> = items
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "email": s.email,
                "address": s.address,
                "rating": s.rating,
                "total_ratings": s.total_ratings,
                "created_at": s.created_at,
            })
        })
        .collect();

    Ok(Json(json!({
        "stores": stores,
        "pagination": pagination,
    })))
}

/// Request to create a store.
#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub owner_id: Option<i32>,
}

/// Create a store, optionally assigned to an owner account.
///
/// POST /api/admin/stores
///
/// # Errors
///
/// Returns 400 for validation failures, 404 for an unknown owner, and 409
/// for a duplicate email.
pub async fn create_store(
    State(state): State<AppState>,
    RequireAdmin(_identity): RequireAdmin,
    Json(req): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    if req.name.is_empty() || req.name.chars().count() > MAX_STORE_NAME_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Store name must be between 1 and {MAX_STORE_NAME_LENGTH} characters"
        )));
    }
    let email = Email::parse(&req.email)
        .map_err(|_| AppError::BadRequest("Please provide a valid email".to_owned()))?;
    validate_address(req.address.as_deref())?;

    let store = state
        .store()
        .create_store(NewStore {
            name: req.name,
            email,
            address: req.address,
            owner_id: req.owner_id.map(UserId::new),
        })
        .await?;

    state.dashboards().invalidate_admin().await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Store added successfully",
            "store": store,
        })),
    ))
}

/// Request to update a store.
#[derive(Debug, Deserialize)]
pub struct UpdateStoreRequest {
    pub name: String,
    pub email: String,
    pub address: Option<String>,
}

/// Update a store's name, email, and address. The cached rating summary
/// is untouched.
///
/// PUT /api/admin/stores/{id}
///
/// # Errors
///
/// Returns 400 for validation failures, 404 for unknown ids, and 409 when
/// the email belongs to another store.
pub async fn update_store(
    State(state): State<AppState>,
    RequireAdmin(_identity): RequireAdmin,
    Path(id): Path<i32>,
    Json(req): Json<UpdateStoreRequest>,
) -> Result<Json<Value>> {
    if req.name.is_empty() || req.name.chars().count() > MAX_STORE_NAME_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Store name must be between 1 and {MAX_STORE_NAME_LENGTH} characters"
        )));
    }
    let email = Email::parse(&req.email)
        .map_err(|_| AppError::BadRequest("Please provide a valid email".to_owned()))?;
    validate_address(req.address.as_deref())?;

    let store_id = StoreId::new(id);
    let store = state
        .store()
        .update_store(
            store_id,
            StoreUpdate {
                name: req.name,
                email,
                address: req.address,
            },
        )
        .await?;

    state.dashboards().invalidate_owner(store_id).await;
    state.dashboards().invalidate_admin().await;

    Ok(Json(json!({
        "message": "Store updated successfully",
        "store": store,
    })))
}

/// Delete a store and its ratings.
///
/// DELETE /api/admin/stores/{id}
///
/// # Errors
///
/// Returns 404 for unknown ids.
pub async fn delete_store(
    State(state): State<AppState>,
    RequireAdmin(_identity): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Json<Value>> {
    let store_id = StoreId::new(id);
    state.store().delete_store(store_id).await?;

    state.dashboards().invalidate_owner(store_id).await;
    state.dashboards().invalidate_admin().await;

    Ok(Json(json!({ "message": "Store deleted successfully" })))
}
