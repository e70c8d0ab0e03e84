//! Authentication error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] storerate_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Email is already registered (by a user or a store).
    #[error("email already registered")]
    EmailTaken,

    /// A submitted field failed validation.
    #[error("{0}")]
    InvalidField(String),

    /// Token missing, malformed, expired, or signed with the wrong key.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken => Self::EmailTaken,
            StoreError::UserNotFound => Self::UserNotFound,
            other => Self::Storage(other),
        }
    }
}
