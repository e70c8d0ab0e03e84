//! Account profile and password management.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::auth::{validate_address, validate_name};
use crate::state::AppState;
use crate::store::ProfileUpdate;

/// Profile response.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
}

/// The caller's account profile.
///
/// GET /api/users/profile
///
/// # Errors
///
/// Returns 404 if the account behind the token no longer exists.
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<ProfileResponse>> {
    let user = state
        .store()
        .user_by_id(identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;

    Ok(Json(ProfileResponse { user }))
}

/// Request to update the caller's profile. Absent fields are unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub address: Option<String>,
}

/// Update the caller's own name and/or address.
///
/// PUT /api/users/profile
///
/// # Errors
///
/// Returns 400 when no fields are given or a given field fails
/// validation, and 404 if the account behind the token no longer exists.
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>> {
    let update = ProfileUpdate {
        name: req.name,
        address: req.address,
    };
    if update.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_owned()));
    }
    if let Some(name) = update.name.as_deref() {
        validate_name(name)?;
    }
    validate_address(update.address.as_deref())?;

    let user = state.store().update_profile(identity.id, update).await?;

    Ok(Json(serde_json::json!({
        "message": "Profile updated successfully",
        "user": user,
    })))
}

/// Request to change the caller's password.
#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Change the caller's password.
///
/// PUT /api/users/update-password
///
/// # Errors
///
/// Returns 401 if the current password is wrong and 400 if the new one
/// fails the password policy.
pub async fn update_password(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    state
        .auth()
        .update_password(identity.id, &req.current_password, &req.new_password)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Password updated successfully"
    })))
}
