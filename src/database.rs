use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::config::Config;
use crate::models::user::ROLE_ADMIN;

pub type Database = PgPool;

pub async fn create_database_connection(config: &Config) -> Result<Database, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await?;

    tracing::info!("database connected");
    Ok(pool)
}

pub async fn run_migrations(pool: &Database) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("migrations executed");
    Ok(())
}

/// Makes sure the admin account exists. Registration always creates plain
/// users, and bcrypt cannot run inside a SQL migration, so the admin row is
/// seeded here instead.
pub async fn seed_admin(pool: &Database, config: &Config) -> Result<(), sqlx::Error> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
    )
    .bind(&config.admin_email)
    .fetch_one(pool)
    .await?;

    if exists {
        return Ok(());
    }

    let password_hash = bcrypt::hash(&config.admin_password, bcrypt::DEFAULT_COST)
        .map_err(|e| sqlx::Error::Protocol(format!("bcrypt: {e}")))?;

    sqlx::query(
        "INSERT INTO users (id, first_name, last_name, email, password_hash, role)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind("Super")
    .bind("Admin")
    .bind(&config.admin_email)
    .bind(&password_hash)
    .bind(ROLE_ADMIN)
    .execute(pool)
    .await?;

    tracing::info!("seeded admin account {}", config.admin_email);
    Ok(())
}
