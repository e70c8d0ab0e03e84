//! Authentication service.
//!
//! Handles account registration, login, password changes, and the bearer
//! tokens the API hands out. Passwords are hashed with Argon2id; tokens are
//! HS256 JWTs carrying the account id and role.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use storerate_core::{Email, Role, UserId};

use crate::models::User;
use crate::store::{NewUser, RatingStore};

/// Password length bounds.
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 16;

/// Account name length bounds.
const MIN_NAME_LENGTH: usize = 20;
const MAX_NAME_LENGTH: usize = 60;

/// Maximum address length.
const MAX_ADDRESS_LENGTH: usize = 400;

/// Token lifetime in seconds (24 hours).
const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Claims carried inside every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: i32,
    /// Account role at issue time.
    pub role: Role,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiry timestamp (seconds since epoch).
    pub exp: i64,
}

/// Authentication service.
pub struct AuthService {
    store: Arc<dyn RatingStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create a new authentication service signing tokens with `jwt_secret`.
    #[must_use]
    pub fn new(store: Arc<dyn RatingStore>, jwt_secret: &SecretString) -> Self {
        let secret = jwt_secret.expose_secret().as_bytes();
        Self {
            store,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Register a new account. Self-registration always creates the `user`
    /// role; owner and admin accounts are created through the admin API.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidField` if a field fails validation,
    /// `AuthError::InvalidEmail` for a malformed email, and
    /// `AuthError::EmailTaken` if the email is already registered.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        address: Option<&str>,
    ) -> Result<(User, String), AuthError> {
        validate_name(name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;
        validate_address(address)?;

        let password_hash = hash_password(password)?;
        let user = self
            .store
            .create_user(NewUser {
                name: name.to_owned(),
                email,
                password_hash,
                address: address.map(str::to_owned),
                role: Role::User,
            })
            .await?;

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password does not match. The two cases are deliberately identical.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .store
            .user_for_login(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    /// Change the password of an authenticated account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` does not match
    /// the stored hash, and `AuthError::InvalidField` if `new` fails the
    /// password policy.
    pub async fn update_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        validate_password(new)?;

        let user = self
            .store
            .user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let (_, password_hash) = self
            .store
            .user_for_login(&user.email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        verify_password(current, &password_hash)?;

        let new_hash = hash_password(new)?;
        self.store.update_password(user_id, &new_hash).await?;
        Ok(())
    }

    /// Issue a signed token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if signing fails.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.as_i32(),
            role: user.role,
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Decode and verify a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is malformed, expired,
    /// or signed with a different key.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

/// Validate an account name: 20-60 characters.
///
/// # Errors
///
/// Returns `AuthError::InvalidField` with a user-facing message.
pub fn validate_name(name: &str) -> Result<(), AuthError> {
    let len = name.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&len) {
        return Err(AuthError::InvalidField(format!(
            "Name must be between {MIN_NAME_LENGTH} and {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a password: 8-16 characters with at least one uppercase letter
/// and one special character.
///
/// # Errors
///
/// Returns `AuthError::InvalidField` with a user-facing message.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        return Err(AuthError::InvalidField(format!(
            "Password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(AuthError::InvalidField(
            "Password must contain at least one uppercase letter".to_owned(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_punctuation()) {
        return Err(AuthError::InvalidField(
            "Password must contain at least one special character".to_owned(),
        ));
    }
    Ok(())
}

/// Validate an optional address: at most 400 characters.
///
/// # Errors
///
/// Returns `AuthError::InvalidField` with a user-facing message.
pub fn validate_address(address: Option<&str>) -> Result<(), AuthError> {
    if let Some(address) = address
        && address.chars().count() > MAX_ADDRESS_LENGTH
    {
        return Err(AuthError::InvalidField(format!(
            "Address must be at most {MAX_ADDRESS_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
