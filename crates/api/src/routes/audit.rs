//! Audit log endpoint.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::audit::{self, AuditEntry};
use crate::error::AppError;
use crate::middleware::RequireSession;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/audit", get(index))
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

/// A page of audit entries, newest first.
async fn index(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);
    Ok(Json(audit::list(state.pool(), limit, offset).await?))
}
