//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side failures to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Client-facing messages are part of the API
//! contract: the UI distinguishes "already rated" from "not rated yet" from
//! "store not found" to decide which action to offer.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::store::StoreError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Internal(_)
                | Self::Storage(StoreError::Unavailable(_))
                | Self::Auth(AuthError::Storage(_) | AuthError::PasswordHash)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Storage(err) => match err {
                StoreError::AlreadyRated | StoreError::EmailTaken | StoreError::Conflict => {
                    StatusCode::CONFLICT
                }
                StoreError::NotRated | StoreError::StoreNotFound | StoreError::UserNotFound => {
                    StatusCode::NOT_FOUND
                }
                StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::InvalidToken => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::EmailTaken => StatusCode::CONFLICT,
                AuthError::InvalidField(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
                AuthError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Stable client-facing messages; internals stay out of responses.
        let message = match &self {
            Self::Storage(err) => match err {
                StoreError::AlreadyRated | StoreError::Conflict => {
                    "You have already rated this store. Use PUT to modify your rating.".to_owned()
                }
                StoreError::NotRated => {
                    "You have not rated this store yet. Use POST to submit a new rating.".to_owned()
                }
                StoreError::StoreNotFound => "Store not found".to_owned(),
                StoreError::UserNotFound => "User not found".to_owned(),
                StoreError::EmailTaken => "This email is already registered".to_owned(),
                StoreError::Unavailable(_) => "Service temporarily unavailable".to_owned(),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_owned(),
                AuthError::InvalidToken => "Invalid or expired token".to_owned(),
                AuthError::EmailTaken => "An account with this email already exists".to_owned(),
                AuthError::InvalidField(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
                AuthError::UserNotFound => "User not found".to_owned(),
                AuthError::PasswordHash => "Internal server error".to_owned(),
                AuthError::Storage(_) => "Service temporarily unavailable".to_owned(),
            },
            Self::Internal(_) => "Internal server error".to_owned(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_storage_errors_map_to_distinct_statuses() {
        assert_eq!(
            status_of(AppError::Storage(StoreError::AlreadyRated)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Storage(StoreError::Conflict)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Storage(StoreError::NotRated)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Storage(StoreError::StoreNotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_auth_errors_map_to_statuses() {
        assert_eq!(
            status_of(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Auth(AuthError::EmailTaken)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Forbidden("admin only".to_owned())),
            StatusCode::FORBIDDEN
        );
    }
}
