//! Shipment processing queue.
//!
//! Jobs live in Postgres (`shipment_jobs`); the worker claims the next
//! due row with `FOR UPDATE SKIP LOCKED`, drives the shipment through
//! `processing -> shipped`, and settles the job as `succeeded`. Failed
//! attempts are rescheduled with exponential backoff until the attempt
//! budget runs out, after which the job parks as `dead` and the shipment
//! as `failed` for an operator to re-queue.
//!
//! Shutdown is graceful: a job in flight is finished before the worker
//! exits.

use std::time::Duration;

use rakuda_core::{ShipmentId, ShipmentStatus};
use serde_json::json;
use sqlx::PgPool;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::cache::{CacheNamespace, CacheService};
use crate::config::JobsConfig;
use crate::db::shipment_jobs::{self, ShipmentJob};
use crate::db::shipments::{self, CompletedShipment, PendingShipment};
use crate::error::AppError;
use crate::services::audit::AuditService;
use crate::services::messages::MessageService;

/// Actor recorded on worker-driven audit entries.
const WORKER_ACTOR: &str = "shipment-worker";

/// Template trigger fired after a shipment completes.
const SHIPPED_TRIGGER: &str = "order_shipped";

/// Shipment queue service: enqueue API plus the worker loop.
#[derive(Debug, Clone)]
pub struct ShipmentQueue {
    pool: PgPool,
    jobs: JobsConfig,
    cache: CacheService,
    audit: AuditService,
    messages: MessageService,
}

impl ShipmentQueue {
    /// Create a new shipment queue service.
    #[must_use]
    pub const fn new(
        pool: PgPool,
        jobs: JobsConfig,
        cache: CacheService,
        audit: AuditService,
        messages: MessageService,
    ) -> Self {
        Self {
            pool,
            jobs,
            cache,
            audit,
            messages,
        }
    }

    /// Paid orders awaiting shipment, served through the 1-minute
    /// `PendingShipments` cache.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    pub async fn pending(&self) -> Result<Vec<PendingShipment>, AppError> {
        self.cache
            .get_or_fetch(CacheNamespace::PendingShipments, None, || async {
                Ok(shipments::list_pending(&self.pool).await?)
            })
            .await
    }

    /// Enqueue processing for a shipment.
    ///
    /// Idempotent while a live job exists; the boolean is `true` when a
    /// new job was created.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing shipment, `Conflict` when it has
    /// already shipped.
    #[instrument(skip(self), fields(shipment_id = %shipment_id, actor = %actor))]
    pub async fn enqueue(
        &self,
        shipment_id: ShipmentId,
        actor: &str,
    ) -> Result<(ShipmentJob, bool), AppError> {
        let shipment = shipments::get(&self.pool, shipment_id).await?;
        if shipment.status == ShipmentStatus::Shipped {
            return Err(AppError::Conflict(format!(
                "shipment {shipment_id} has already shipped"
            )));
        }

        let (job, created) =
            shipment_jobs::enqueue(&self.pool, shipment_id, self.jobs.max_attempts).await?;

        if created {
            info!(job_id = %job.id, "Shipment job enqueued");
            self.audit
                .record(
                    actor,
                    "shipment.enqueue",
                    Some(&format!("shipment:{shipment_id}")),
                    json!({ "job_id": job.id, "max_attempts": job.max_attempts }),
                )
                .await;
        } else {
            info!(job_id = %job.id, "Live job already queued for shipment");
        }

        Ok((job, created))
    }

    /// Worker loop. Drains due jobs back to back, sleeps for the poll
    /// interval when the queue is idle, and exits after finishing the
    /// current job once the shutdown signal flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_secs = self.jobs.poll_secs,
            max_attempts = self.jobs.max_attempts,
            "Shipment worker started"
        );

        loop {
            let claimed = match shipment_jobs::claim_next(&self.pool).await {
                Ok(claimed) => claimed,
                Err(e) => {
                    error!(error = %e, "Failed to claim shipment job");
                    None
                }
            };

            match claimed {
                Some(job) => {
                    self.process_job(job).await;
                    if *shutdown.borrow() {
                        info!("Shipment worker stopping after current job");
                        return;
                    }
                }
                None => {
                    tokio::select! {
                        () = tokio::time::sleep(Duration::from_secs(self.jobs.poll_secs.max(1))) => {}
                        _ = shutdown.changed() => {
                            info!("Shipment worker stopping");
                            return;
                        }
                    }
                }
            }
        }
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, shipment_id = %job.shipment_id, attempt = job.attempts))]
    async fn process_job(&self, job: ShipmentJob) {
        match self.attempt(&job).await {
            Ok(completed) => self.settle_success(&job, &completed).await,
            Err(e) => self.settle_failure(&job, &e.to_string()).await,
        }
    }

    async fn attempt(&self, job: &ShipmentJob) -> Result<CompletedShipment, AppError> {
        shipments::mark_processing(&self.pool, job.shipment_id).await?;

        let (carrier, tracking_number) = issue_label();
        let completed =
            shipments::complete(&self.pool, job.shipment_id, &carrier, &tracking_number).await?;

        Ok(completed)
    }

    async fn settle_success(&self, job: &ShipmentJob, completed: &CompletedShipment) {
        if let Err(e) = shipment_jobs::succeed(&self.pool, job.id).await {
            error!(error = %e, "Failed to mark shipment job succeeded");
        }

        let order_id = completed.shipment.order_id;
        info!(
            order_id = %order_id,
            tracking = completed.shipment.tracking_number.as_deref().unwrap_or(""),
            "Shipment processed"
        );

        self.invalidate_shipment_caches().await;

        self.audit
            .record(
                WORKER_ACTOR,
                "shipment.shipped",
                Some(&format!("shipment:{}", completed.shipment.id)),
                json!({
                    "job_id": job.id,
                    "order_id": order_id,
                    "carrier": completed.shipment.carrier,
                    "tracking_number": completed.shipment.tracking_number,
                    "quantity": completed.quantity,
                }),
            )
            .await;

        // Buyer notification is best-effort; the shipment stands either way.
        match self
            .messages
            .generate_for_trigger(order_id, SHIPPED_TRIGGER)
            .await
        {
            Ok(Some(message)) => {
                info!(message_id = %message.id, "Shipped notification generated");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Failed to generate shipped notification");
            }
        }
    }

    async fn settle_failure(&self, job: &ShipmentJob, reason: &str) {
        warn!(
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            reason,
            "Shipment attempt failed"
        );

        if job.attempts >= job.max_attempts {
            if let Err(e) = shipment_jobs::park_dead(&self.pool, job.id, reason).await {
                error!(error = %e, "Failed to park dead shipment job");
            }

            // The shipment may never have reached processing (claimed but
            // conflicted); failing it then is expected to miss.
            match shipments::mark_failed(&self.pool, job.shipment_id).await {
                Ok(_) => {}
                Err(crate::db::RepositoryError::NotFound) => {}
                Err(e) => error!(error = %e, "Failed to mark shipment failed"),
            }

            self.invalidate_shipment_caches().await;

            self.audit
                .record(
                    WORKER_ACTOR,
                    "shipment.job_dead",
                    Some(&format!("shipment:{}", job.shipment_id)),
                    json!({
                        "job_id": job.id,
                        "attempts": job.attempts,
                        "error": reason,
                    }),
                )
                .await;
        } else {
            let delay = backoff_delay(self.jobs.backoff_base_secs, job.attempts);
            info!(retry_in_secs = delay.as_secs(), "Rescheduling shipment job");
            if let Err(e) = shipment_jobs::reschedule(&self.pool, job.id, reason, delay).await {
                error!(error = %e, "Failed to reschedule shipment job");
            }
        }
    }

    // Pending list and dashboard counters both change with shipment state.
    // Worker context has nobody to propagate to; the 1m/5m TTLs bound the
    // staleness a failed invalidation can cause.
    async fn invalidate_shipment_caches(&self) {
        if let Err(e) = self
            .cache
            .invalidate_namespace(CacheNamespace::PendingShipments)
            .await
        {
            warn!(error = %e, "Failed to invalidate pending-shipments cache");
        }
        if let Err(e) = self.cache.invalidate(CacheNamespace::DashboardStats, None).await {
            warn!(error = %e, "Failed to invalidate dashboard cache");
        }
    }
}

/// Delay before retry `attempts + 1`: `base * 2^(attempts - 1)`, so the
/// first retry waits the base interval and each retry doubles it.
fn backoff_delay(base_secs: u64, attempts: i32) -> Duration {
    let exponent = u32::try_from(attempts.saturating_sub(1)).unwrap_or(0);
    Duration::from_secs(base_secs.saturating_mul(2u64.saturating_pow(exponent)))
}

/// Placeholder carrier handoff. Until a real carrier integration exists,
/// processing stamps a Japan Post registered-mail style label so the
/// downstream flow (tracking in buyer messages, backlog display) is
/// exercised end to end.
fn issue_label() -> (String, String) {
    use rand::Rng;
    let serial: u32 = rand::rng().random_range(100_000_000..1_000_000_000);
    ("Japan Post".to_string(), format!("RR{serial}JP"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(30, 1), Duration::from_secs(30));
        assert_eq!(backoff_delay(30, 2), Duration::from_secs(60));
        assert_eq!(backoff_delay(30, 3), Duration::from_secs(120));
        assert_eq!(backoff_delay(30, 4), Duration::from_secs(240));
    }

    #[test]
    fn test_backoff_clamps_degenerate_attempts() {
        assert_eq!(backoff_delay(30, 0), Duration::from_secs(30));
        assert_eq!(backoff_delay(30, -5), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let delay = backoff_delay(u64::MAX, 10);
        assert_eq!(delay, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_issue_label_matches_registered_mail_format() {
        let (carrier, tracking) = issue_label();
        assert_eq!(carrier, "Japan Post");
        assert!(tracking.starts_with("RR"));
        assert!(tracking.ends_with("JP"));
        assert_eq!(tracking.len(), 13);
        assert!(tracking.chars().skip(2).take(9).all(|c| c.is_ascii_digit()));
    }
}
