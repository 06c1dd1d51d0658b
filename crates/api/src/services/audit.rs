//! Best-effort audit trail writes.
//!
//! Mutating operations record who did what, but an audit insert failing
//! must never fail the operation it describes. This service logs and
//! swallows database errors; the read side (`db::audit::list`) is used
//! directly by the admin routes.

use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;

use crate::db::audit;

/// Fire-and-forget audit writer shared across services and routes.
#[derive(Debug, Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    /// Create a new audit service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an audit entry.
    ///
    /// Failures are logged at WARN and swallowed so the audited
    /// operation still succeeds.
    pub async fn record(&self, actor: &str, action: &str, entity: Option<&str>, detail: Value) {
        if let Err(e) = audit::record(&self.pool, actor, action, entity, detail).await {
            warn!(
                actor = %actor,
                action = %action,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }
}
