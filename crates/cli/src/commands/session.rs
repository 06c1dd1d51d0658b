//! Operator session management.
//!
//! # Usage
//!
//! ```bash
//! # 30-day session for a person
//! rakuda session issue --label "meg-laptop"
//!
//! # Short-lived session for a script
//! rakuda session issue --label "repricer-cron" --ttl-hours 24
//! ```
//!
//! The plaintext token is written to stdout exactly once; only its
//! SHA-256 hash is stored. Lose the token, revoke the session and issue
//! a new one.
//!
//! # Environment Variables
//!
//! - `RAKUDA_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)

use rand::RngCore;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

use rakuda_api::db::sessions;
use rakuda_api::middleware::token_hash;

/// Errors that can occur while issuing a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Neither `RAKUDA_DATABASE_URL` nor `DATABASE_URL` is set.
    #[error("Missing environment variable: RAKUDA_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// The label is empty or too long.
    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    /// The TTL is not a positive number of hours.
    #[error("Invalid TTL: {0} hours")]
    InvalidTtl(i64),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] rakuda_api::db::RepositoryError),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(#[from] sqlx::Error),
}

/// Issue a session and print its bearer token.
///
/// # Arguments
///
/// * `label` - Who or what the session is for
/// * `ttl_hours` - Session lifetime in hours
///
/// # Errors
///
/// Returns an error if the label or TTL is invalid, or the insert fails.
pub async fn issue(label: &str, ttl_hours: i64) -> Result<(), SessionError> {
    dotenvy::dotenv().ok();

    let label = label.trim();
    if label.is_empty() || label.len() > 80 {
        return Err(SessionError::InvalidLabel(label.to_owned()));
    }
    if ttl_hours <= 0 {
        return Err(SessionError::InvalidTtl(ttl_hours));
    }

    let database_url = super::database_url().ok_or(SessionError::MissingDatabaseUrl)?;

    info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);

    let session = sessions::create(
        &pool,
        &token_hash(&token),
        label,
        chrono::Duration::hours(ttl_hours),
    )
    .await?;

    // The token goes to stdout so it can be captured by scripts;
    // everything else goes through tracing.
    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }

    info!(
        session_id = %session.id,
        label,
        expires_at = %session.expires_at,
        "Session issued"
    );
    info!("The token above is shown once and stored only as a hash.");

    Ok(())
}
