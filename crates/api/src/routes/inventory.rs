//! Inventory alert endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::db::products::LowStockProduct;
use crate::error::AppError;
use crate::middleware::RequireSession;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/inventory/alerts", get(alerts))
}

/// Products at or below their low-stock threshold.
async fn alerts(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<LowStockProduct>>, AppError> {
    Ok(Json(state.alerts().low_stock().await?))
}
