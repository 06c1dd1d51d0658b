//! Pricing automation endpoints.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use rakuda_core::ListingId;
use serde::Deserialize;

use crate::db::price_history::{self, PriceChange};
use crate::error::AppError;
use crate::middleware::RequireSession;
use crate::services::repricer::{AppliedPrice, PriceRecommendation};
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/pricing/recommendations", get(recommendations))
        .route("/api/pricing/apply/{listing_id}", post(apply))
        .route("/api/pricing/history/{listing_id}", get(history))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

/// Quotes for every active listing with a strategy (cached 15m).
async fn recommendations(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<PriceRecommendation>>, AppError> {
    Ok(Json(state.repricer().recommendations().await?))
}

/// Apply the current quote to one listing.
///
/// Pushes the price to the marketplace first, then updates local state,
/// logs the change, and drops the affected cache namespaces.
async fn apply(
    RequireSession(session): RequireSession,
    State(state): State<AppState>,
    Path(listing_id): Path<ListingId>,
) -> Result<Json<AppliedPrice>, AppError> {
    Ok(Json(
        state.repricer().apply(listing_id, &session.label).await?,
    ))
}

/// Price change log for one listing, newest first.
async fn history(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
    Path(listing_id): Path<ListingId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PriceChange>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 500);
    Ok(Json(
        price_history::for_listing(state.pool(), listing_id, limit).await?,
    ))
}
