//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a bearer token (and optionally a
//! specific role) in route handlers. Handlers downstream receive a verified
//! [`Identity`] and never touch the raw token.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use storerate_core::{Role, UserId};

use crate::error::AppError;
use crate::state::AppState;

/// The verified identity behind a request: just the account id and the role
/// it held when the token was issued.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub id: UserId,
    pub role: Role,
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(identity): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, account {}!", identity.id)
/// }
/// ```
pub struct RequireAuth(pub Identity);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))?;

        let claims = state.auth().verify_token(token)?;

        Ok(Self(Identity {
            id: UserId::new(claims.sub),
            role: claims.role,
        }))
    }
}

/// Extractor that requires an authenticated admin.
pub struct RequireAdmin(pub Identity);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(identity) = RequireAuth::from_request_parts(parts, state).await?;
        if !identity.role.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_owned()));
        }
        Ok(Self(identity))
    }
}

/// Extractor that requires an authenticated store owner.
pub struct RequireOwner(pub Identity);

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(identity) = RequireAuth::from_request_parts(parts, state).await?;
        if !identity.role.owns_store() {
            return Err(AppError::Forbidden("Owner access required".to_owned()));
        }
        Ok(Self(identity))
    }
}

/// Extractor that requires the rater capability (role `user`).
///
/// Admins and owners browse stores but do not rate them.
pub struct RequireRater(pub Identity);

impl FromRequestParts<AppState> for RequireRater {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(identity) = RequireAuth::from_request_parts(parts, state).await?;
        if !identity.role.can_rate() {
            return Err(AppError::Forbidden(
                "Only normal users can rate stores".to_owned(),
            ));
        }
        Ok(Self(identity))
    }
}
