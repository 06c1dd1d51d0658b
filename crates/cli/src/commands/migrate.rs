//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! rakuda migrate
//! ```
//!
//! # Environment Variables
//!
//! - `RAKUDA_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/api/migrations/` and are embedded into the
//! API crate via `sqlx::migrate!`, so this command needs no filesystem
//! access at runtime. The API itself never runs them on startup; this
//! command is the only writer of the `_sqlx_migrations` table.

use secrecy::ExposeSecret;
use sqlx::PgPool;

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Neither `RAKUDA_DATABASE_URL` nor `DATABASE_URL` is set.
    #[error("Missing environment variable: RAKUDA_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection
/// fails, or a migration fails to apply.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = super::database_url().ok_or(MigrationError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running migrations...");
    rakuda_api::db::MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
