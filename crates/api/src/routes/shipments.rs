//! Shipment backlog and job queue endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rakuda_core::ShipmentId;
use uuid::Uuid;

use crate::db::shipment_jobs::{self, ShipmentJob};
use crate::db::shipments::PendingShipment;
use crate::error::AppError;
use crate::middleware::RequireSession;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/shipments/pending", get(pending))
        .route("/api/shipments/{id}/process", post(process))
        .route("/api/shipments/jobs/{id}", get(job_status))
}

/// Paid orders awaiting shipment, served through the 1-minute cache.
async fn pending(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<PendingShipment>>, AppError> {
    Ok(Json(state.shipment_queue().pending().await?))
}

/// Enqueue processing for a shipment.
///
/// 202 with the new job, or 200 with the existing one when a live job
/// already covers this shipment.
async fn process(
    RequireSession(session): RequireSession,
    State(state): State<AppState>,
    Path(id): Path<ShipmentId>,
) -> Result<(StatusCode, Json<ShipmentJob>), AppError> {
    let (job, created) = state.shipment_queue().enqueue(id, &session.label).await?;
    let status = if created {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(job)))
}

/// Status of one shipment job.
async fn job_status(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShipmentJob>, AppError> {
    Ok(Json(shipment_jobs::get(state.pool(), id).await?))
}
