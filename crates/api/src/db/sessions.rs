//! Database operations for operator bearer sessions.
//!
//! Plaintext tokens never touch this table; callers hash them with
//! SHA-256 and both issuance and lookup work on the hex digest.

use chrono::{DateTime, Duration, Utc};
use rakuda_core::SessionId;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// An operator session, stored by token hash.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SecuritySession {
    /// Unique session ID.
    pub id: SessionId,
    /// SHA-256 hex digest of the bearer token.
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// Operator-supplied label (workstation name, automation job).
    pub label: String,
    /// When the session was issued.
    pub created_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
    /// When the session was revoked, if it was.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Last successful authentication with this session.
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl SecuritySession {
    /// Whether the session can still authenticate requests.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.expires_at > Utc::now()
    }
}

const SESSION_COLUMNS: &str =
    "id, token_hash, label, created_at, expires_at, revoked_at, last_seen_at";

/// Issue a session row for a token hash.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn create(
    pool: &PgPool,
    token_hash: &str,
    label: &str,
    ttl: Duration,
) -> Result<SecuritySession, RepositoryError> {
    let session = sqlx::query_as::<_, SecuritySession>(&format!(
        r"
        INSERT INTO security_sessions (token_hash, label, expires_at)
        VALUES ($1, $2, NOW() + make_interval(secs => $3))
        RETURNING {SESSION_COLUMNS}
        "
    ))
    .bind(token_hash)
    .bind(label)
    .bind(ttl.num_seconds())
    .fetch_one(pool)
    .await?;

    Ok(session)
}

/// Find a live session by token hash.
///
/// Expired and revoked sessions are not returned.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn find_active_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<SecuritySession>, RepositoryError> {
    let session = sqlx::query_as::<_, SecuritySession>(&format!(
        r"
        SELECT {SESSION_COLUMNS}
        FROM security_sessions
        WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > NOW()
        "
    ))
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(session)
}

/// Stamp a session's `last_seen_at`.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn touch(pool: &PgPool, id: SessionId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE security_sessions SET last_seen_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Revoke a session. Already-revoked sessions stay revoked at their
/// original timestamp.
///
/// # Errors
///
/// Returns `NotFound` if the session does not exist.
pub async fn revoke(pool: &PgPool, id: SessionId) -> Result<SecuritySession, RepositoryError> {
    let session = sqlx::query_as::<_, SecuritySession>(&format!(
        r"
        UPDATE security_sessions
        SET revoked_at = COALESCE(revoked_at, NOW())
        WHERE id = $1
        RETURNING {SESSION_COLUMNS}
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    session.ok_or(RepositoryError::NotFound)
}

/// All sessions, newest first.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn list(pool: &PgPool) -> Result<Vec<SecuritySession>, RepositoryError> {
    let sessions = sqlx::query_as::<_, SecuritySession>(&format!(
        r"
        SELECT {SESSION_COLUMNS}
        FROM security_sessions
        ORDER BY created_at DESC
        "
    ))
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}

/// Delete sessions whose expiry has passed. Returns how many went.
///
/// # Errors
///
/// Returns error if the database delete fails.
pub async fn sweep_expired(pool: &PgPool) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM security_sessions WHERE expires_at < NOW()")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
