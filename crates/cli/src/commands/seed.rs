//! Seed the database with sample users, stores, and ratings.
//!
//! Intended for local development. Every seeded account shares the
//! password `Sample#Pass1` so the API can be exercised immediately.
//!
//! # Usage
//!
//! ```bash
//! sr-cli seed
//! ```
//!
//! # Environment Variables
//!
//! - `STORERATE_DATABASE_URL` - `PostgreSQL` connection string
//!   (`DATABASE_URL` is accepted as a fallback)

use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use storerate_core::Role;
use storerate_server::services::auth::hash_password;

const SEED_PASSWORD: &str = "Sample#Pass1";

const USERS: &[(&str, &str, Role, &str)] = &[
    (
        "Olivia Hartman Storekeeper",
        "olivia.owner@example.com",
        Role::Owner,
        "12 Market Lane, Springfield",
    ),
    (
        "Marcus Delaney Storekeeper",
        "marcus.owner@example.com",
        Role::Owner,
        "48 Harbor Road, Riverside",
    ),
    (
        "Amelia Rhodes Frequent Shopper",
        "amelia@example.com",
        Role::User,
        "7 Elm Street, Springfield",
    ),
    (
        "Benjamin Cole Frequent Shopper",
        "benjamin@example.com",
        Role::User,
        "22 Oak Avenue, Riverside",
    ),
    (
        "Charlotte Nguyen Casual Shopper",
        "charlotte@example.com",
        Role::User,
        "3 Pine Court, Lakeside",
    ),
];

const STORES: &[(&str, &str, &str, &str)] = &[
    (
        "Hartman's General Goods",
        "shop@hartmans.example.com",
        "12 Market Lane, Springfield",
        "olivia.owner@example.com",
    ),
    (
        "Delaney Hardware",
        "shop@delaney.example.com",
        "48 Harbor Road, Riverside",
        "marcus.owner@example.com",
    ),
];

const RATINGS: &[(&str, &str, i32)] = &[
    ("amelia@example.com", "Hartman's General Goods", 5),
    ("benjamin@example.com", "Hartman's General Goods", 4),
    ("charlotte@example.com", "Hartman's General Goods", 5),
    ("amelia@example.com", "Delaney Hardware", 3),
    ("benjamin@example.com", "Delaney Hardware", 4),
];

/// Insert sample users, stores, and ratings.
///
/// Skips rows that already exist so the command can be re-run safely.
///
/// # Errors
///
/// Returns an error if environment variables are missing or database
/// operations fail.
pub async fn sample_data() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STORERATE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| "STORERATE_DATABASE_URL not set")?;

    let pool = PgPool::connect(&database_url).await?;
    info!("Connected to database");

    let password_hash = hash_password(SEED_PASSWORD).map_err(|e| e.to_string())?;

    let mut tx = pool.begin().await?;

    let mut inserted_users = 0;
    for (name, email, role, address) in USERS {
        let affected = sqlx::query(
            r"
            INSERT INTO users (name, email, password_hash, address, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            ",
        )
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .bind(address)
        .bind(role)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        inserted_users += affected;
    }

    let mut inserted_stores = 0;
    for (name, email, address, owner_email) in STORES {
        let affected = sqlx::query(
            r"
            INSERT INTO stores (name, email, address, owner_id)
            SELECT $1, $2, $3, id FROM users WHERE email = $4
            ON CONFLICT (email) DO NOTHING
            ",
        )
        .bind(name)
        .bind(email)
        .bind(address)
        .bind(owner_email)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        inserted_stores += affected;
    }

    let mut inserted_ratings = 0;
    for (user_email, store_name, score) in RATINGS {
        let affected = sqlx::query(
            r"
            INSERT INTO ratings (user_id, store_id, rating)
            SELECT u.id, s.id, $3
            FROM users u, stores s
            WHERE u.email = $1 AND s.name = $2
            ON CONFLICT (user_id, store_id) DO NOTHING
            ",
        )
        .bind(user_email)
        .bind(store_name)
        .bind(score)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        inserted_ratings += affected;
    }

    refresh_store_aggregates(&mut tx).await?;

    tx.commit().await?;

    info!("Seeding complete!");
    info!("  Users inserted: {inserted_users}");
    info!("  Stores inserted: {inserted_stores}");
    info!("  Ratings inserted: {inserted_ratings}");
    info!("  Seed account password: {SEED_PASSWORD}");

    Ok(())
}

/// Recompute the cached average and count for every store.
async fn refresh_store_aggregates(tx: &mut Transaction<'_, Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        UPDATE stores s
        SET rating = COALESCE(agg.avg_rating, 0),
            total_ratings = COALESCE(agg.n, 0)
        FROM (
            SELECT store_id, AVG(rating::double precision) AS avg_rating, COUNT(*) AS n
            FROM ratings
            GROUP BY store_id
        ) agg
        WHERE agg.store_id = s.id
        ",
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}
