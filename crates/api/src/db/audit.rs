//! Database operations for the audit trail.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// One audit entry: who did what, to which entity, when.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditEntry {
    /// Row ID.
    pub id: i64,
    /// Who performed the action (session label, `repricer`, `worker`).
    pub actor: String,
    /// Action name, e.g. `pricing.apply` or `cache.flush`.
    pub action: String,
    /// Entity reference like `listing:42`, if the action has a subject.
    pub entity: Option<String>,
    /// Structured detail payload.
    pub detail: serde_json::Value,
    /// When the action happened.
    pub created_at: DateTime<Utc>,
}

/// Append an entry to the audit log.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn record(
    pool: &PgPool,
    actor: &str,
    action: &str,
    entity: Option<&str>,
    detail: serde_json::Value,
) -> Result<AuditEntry, RepositoryError> {
    let entry = sqlx::query_as::<_, AuditEntry>(
        r"
        INSERT INTO audit_log (actor, action, entity, detail)
        VALUES ($1, $2, $3, $4)
        RETURNING id, actor, action, entity, detail, created_at
        ",
    )
    .bind(actor)
    .bind(action)
    .bind(entity)
    .bind(detail)
    .fetch_one(pool)
    .await?;

    Ok(entry)
}

/// A page of audit entries, newest first.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn list(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<AuditEntry>, RepositoryError> {
    let entries = sqlx::query_as::<_, AuditEntry>(
        r"
        SELECT id, actor, action, entity, detail, created_at
        FROM audit_log
        ORDER BY created_at DESC, id DESC
        LIMIT $1 OFFSET $2
        ",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
