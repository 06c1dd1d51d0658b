//! Database operations for the back-office `PostgreSQL`.
//!
//! ## Tables
//!
//! - `products` - Supplier catalog (JPY cost, stock levels)
//! - `listings` - Marketplace offers for products (USD price, strategy)
//! - `orders` - Marketplace orders against listings
//! - `shipments` - One shipment per paid order
//! - `shipment_jobs` - Queue rows driving the shipment worker
//! - `exchange_rates` - Fetched rate history per currency pair
//! - `competitor_prices` - Observed competitor prices per listing
//! - `price_history` - Every applied price change
//! - `message_templates` / `customer_messages` - Buyer messaging
//! - `security_sessions` - Operator bearer sessions (hashes only)
//! - `audit_log` - Who did what, when
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p rakuda-cli -- migrate
//! ```
//!
//! All queries are runtime-checked (`sqlx::query_as`), so the crate builds
//! without a live database.

pub mod audit;
pub mod competitor_prices;
pub mod exchange_rates;
pub mod listings;
pub mod messages;
pub mod orders;
pub mod price_history;
pub mod products;
pub mod sessions;
pub mod shipment_jobs;
pub mod shipments;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate SKU, illegal status transition).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Embedded migrations, applied by the CLI's `migrate` command.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
