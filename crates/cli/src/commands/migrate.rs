//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! bs-cli migrate run
//!
//! # Show applied and pending migrations
//! bs-cli migrate status
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migration files live in `crates/storefront/migrations/`.

use std::collections::HashSet;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;

use super::{CommandError, database_url};

static MIGRATOR: Migrator = sqlx::migrate!("../storefront/migrations");

async fn connect() -> Result<PgPool, CommandError> {
    let url = database_url()?;
    tracing::info!("Connecting to storefront database...");
    Ok(PgPool::connect(url.expose_secret()).await?)
}

/// Apply every pending storefront migration.
///
/// # Errors
///
/// Fails if the database URL is missing, the connection fails, or a
/// migration does not apply cleanly.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Storefront migrations complete");
    Ok(())
}

/// Log which migrations have been applied and which are pending.
///
/// # Errors
///
/// Fails if the database cannot be reached or the migrations table cannot
/// be read.
pub async fn status() -> Result<(), CommandError> {
    let pool = connect().await?;

    // The table does not exist until the first run.
    let applied: HashSet<i64> =
        sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(&pool)
            .await
            .unwrap_or_default()
            .into_iter()
            .collect();

    for migration in MIGRATOR.iter() {
        if applied.contains(&migration.version) {
            tracing::info!(version = migration.version, "applied: {}", migration.description);
        } else {
            tracing::warn!(version = migration.version, "pending: {}", migration.description);
        }
    }
    Ok(())
}
