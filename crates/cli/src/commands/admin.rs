//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! sr-cli admin create -e admin@example.com -n "Platform Administrator" -p 'S3cret!pw'
//! ```
//!
//! # Environment Variables
//!
//! - `STORERATE_DATABASE_URL` - `PostgreSQL` connection string
//!   (`DATABASE_URL` is accepted as a fallback)

use sqlx::PgPool;
use thiserror::Error;

use storerate_core::{Email, Role};
use storerate_server::services::auth::{hash_password, validate_name, validate_password};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Name or password does not satisfy platform policy.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// User already exists.
    #[error("A user already exists with email: {0}")]
    UserExists(String),
}

/// Create a new admin user.
///
/// # Arguments
///
/// * `email` - Admin's email address
/// * `name` - Admin's display name (20-60 characters)
/// * `password` - Admin's password (8-16 characters, one uppercase, one special)
/// * `address` - Admin's postal address (may be empty)
///
/// # Returns
///
/// The ID of the created admin user.
pub async fn create_user(
    email: &str,
    name: &str,
    password: &str,
    address: &str,
) -> Result<i32, AdminError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    validate_name(name).map_err(|e| AdminError::InvalidField(e.to_string()))?;
    validate_password(password).map_err(|e| AdminError::InvalidField(e.to_string()))?;

    let password_hash =
        hash_password(password).map_err(|e| AdminError::InvalidField(e.to_string()))?;

    let database_url = std::env::var("STORERATE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| AdminError::MissingEnvVar("STORERATE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Creating admin user: {}", email);

    // Check if user already exists
    let existing: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&pool)
        .await?;

    if existing.is_some() {
        return Err(AdminError::UserExists(email.as_str().to_owned()));
    }

    // Create the user
    let user_id: i32 = sqlx::query_scalar(
        r"
        INSERT INTO users (name, email, password_hash, address, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        ",
    )
    .bind(name)
    .bind(email.as_str())
    .bind(&password_hash)
    .bind(address)
    .bind(Role::Admin)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user_id,
        email
    );

    Ok(user_id)
}
