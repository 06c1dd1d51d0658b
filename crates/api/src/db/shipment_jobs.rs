//! Database operations for the shipment job queue.
//!
//! The queue is plain Postgres: workers claim the next due row with
//! `FOR UPDATE SKIP LOCKED`, so any number of processes can drain it
//! without double-claiming. A partial unique index guarantees at most one
//! live (`queued` or `running`) job per shipment, which is what makes
//! `enqueue` idempotent.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rakuda_core::ShipmentId;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;

/// Status of a shipment job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "shipment_job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShipmentJobStatus {
    /// Waiting for a worker (or scheduled for a retry).
    Queued,
    /// Claimed by a worker.
    Running,
    /// Processing finished.
    Succeeded,
    /// Retries exhausted; needs operator attention.
    Dead,
}

/// A queued unit of shipment processing work.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShipmentJob {
    /// Unique job ID.
    pub id: Uuid,
    /// Shipment to process.
    pub shipment_id: ShipmentId,
    /// Current status.
    pub status: ShipmentJobStatus,
    /// Attempts made so far (incremented on claim).
    pub attempts: i32,
    /// Attempts allowed before the job is parked as dead.
    pub max_attempts: i32,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
    /// Earliest time the next attempt may run.
    pub next_run_at: DateTime<Utc>,
    /// When the current (or last) attempt started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
}

const JOB_COLUMNS: &str = "id, shipment_id, status, attempts, max_attempts, last_error, \
     next_run_at, started_at, finished_at, created_at";

/// Enqueue a job for a shipment.
///
/// Idempotent: while a live job exists for the shipment, the existing job
/// is returned instead of inserting a second one. The boolean is `true`
/// when a new job was created.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn enqueue(
    pool: &PgPool,
    shipment_id: ShipmentId,
    max_attempts: i32,
) -> Result<(ShipmentJob, bool), RepositoryError> {
    let inserted = sqlx::query_as::<_, ShipmentJob>(&format!(
        r"
        INSERT INTO shipment_jobs (shipment_id, max_attempts)
        VALUES ($1, $2)
        ON CONFLICT (shipment_id) WHERE status IN ('queued', 'running')
        DO NOTHING
        RETURNING {JOB_COLUMNS}
        "
    ))
    .bind(shipment_id)
    .bind(max_attempts)
    .fetch_optional(pool)
    .await?;

    if let Some(job) = inserted {
        return Ok((job, true));
    }

    let existing = sqlx::query_as::<_, ShipmentJob>(&format!(
        r"
        SELECT {JOB_COLUMNS}
        FROM shipment_jobs
        WHERE shipment_id = $1 AND status IN ('queued', 'running')
        "
    ))
    .bind(shipment_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        // Lost a race with a finishing worker; the caller can retry.
        RepositoryError::Conflict(format!(
            "live job for shipment {shipment_id} vanished during enqueue"
        ))
    })?;

    Ok((existing, false))
}

/// Claim the next due job, marking it `running`.
///
/// Returns `None` when no job is due. Safe to call from several workers
/// at once; `SKIP LOCKED` makes claims non-blocking and exclusive.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn claim_next(pool: &PgPool) -> Result<Option<ShipmentJob>, RepositoryError> {
    let job = sqlx::query_as::<_, ShipmentJob>(&format!(
        r"
        UPDATE shipment_jobs
        SET status = 'running', attempts = attempts + 1, started_at = NOW()
        WHERE id = (
            SELECT id
            FROM shipment_jobs
            WHERE status = 'queued' AND next_run_at <= NOW()
            ORDER BY next_run_at
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING {JOB_COLUMNS}
        "
    ))
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

/// Mark a running job as succeeded.
///
/// # Errors
///
/// Returns `NotFound` if the job does not exist or is not running.
pub async fn succeed(pool: &PgPool, id: Uuid) -> Result<ShipmentJob, RepositoryError> {
    let job = sqlx::query_as::<_, ShipmentJob>(&format!(
        r"
        UPDATE shipment_jobs
        SET status = 'succeeded', finished_at = NOW()
        WHERE id = $1 AND status = 'running'
        RETURNING {JOB_COLUMNS}
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    job.ok_or(RepositoryError::NotFound)
}

/// Return a failed job to the queue for a later retry.
///
/// # Errors
///
/// Returns `NotFound` if the job does not exist or is not running.
pub async fn reschedule(
    pool: &PgPool,
    id: Uuid,
    error: &str,
    delay: Duration,
) -> Result<ShipmentJob, RepositoryError> {
    #[allow(clippy::cast_possible_wrap)] // Backoff delays are far below i64::MAX seconds
    let delay_secs = delay.as_secs() as i64;

    let job = sqlx::query_as::<_, ShipmentJob>(&format!(
        r"
        UPDATE shipment_jobs
        SET status = 'queued', last_error = $2,
            next_run_at = NOW() + make_interval(secs => $3)
        WHERE id = $1 AND status = 'running'
        RETURNING {JOB_COLUMNS}
        "
    ))
    .bind(id)
    .bind(error)
    .bind(delay_secs)
    .fetch_optional(pool)
    .await?;

    job.ok_or(RepositoryError::NotFound)
}

/// Park a job as dead after its final attempt failed.
///
/// # Errors
///
/// Returns `NotFound` if the job does not exist or is not running.
pub async fn park_dead(pool: &PgPool, id: Uuid, error: &str) -> Result<ShipmentJob, RepositoryError> {
    let job = sqlx::query_as::<_, ShipmentJob>(&format!(
        r"
        UPDATE shipment_jobs
        SET status = 'dead', last_error = $2, finished_at = NOW()
        WHERE id = $1 AND status = 'running'
        RETURNING {JOB_COLUMNS}
        "
    ))
    .bind(id)
    .bind(error)
    .fetch_optional(pool)
    .await?;

    job.ok_or(RepositoryError::NotFound)
}

/// Get a job by ID.
///
/// # Errors
///
/// Returns `NotFound` if the job does not exist.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<ShipmentJob, RepositoryError> {
    sqlx::query_as::<_, ShipmentJob>(&format!(
        r"
        SELECT {JOB_COLUMNS}
        FROM shipment_jobs
        WHERE id = $1
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}
