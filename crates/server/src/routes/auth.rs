//! Registration, login, and token verification.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, set_sentry_user};
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::state::AppState;

/// Request to register a new account.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: Option<String>,
}

/// Request to log in.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response carrying a fresh token and the account it belongs to.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: User,
}

/// Register a new account. Self-registration always gets the `user` role.
///
/// POST /api/auth/signup
///
/// # Errors
///
/// Returns 400 for validation failures and 409 when the email is taken.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let (user, token) = state
        .auth()
        .signup(&req.name, &req.email, &req.password, req.address.as_deref())
        .await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_owned(),
            token,
            user,
        }),
    ))
}

/// Log in with email and password.
///
/// POST /api/auth/login
///
/// # Errors
///
/// Returns 401 with an identical message for unknown email and wrong
/// password.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let (user, token) = state.auth().login(&req.email, &req.password).await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(Json(AuthResponse {
        message: "Login successful".to_owned(),
        token,
        user,
    }))
}

/// Response confirming a token is valid.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: User,
}

/// Verify the caller's token and return the account behind it.
///
/// POST /api/auth/verify
///
/// # Errors
///
/// Returns 401 if the token is invalid or the account no longer exists.
pub async fn verify(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<VerifyResponse>> {
    let user = state
        .store()
        .user_by_id(identity.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_owned()))?;

    Ok(Json(VerifyResponse { valid: true, user }))
}
