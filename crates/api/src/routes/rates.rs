//! Exchange-rate endpoints.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use rakuda_core::{Currency, CurrencyPair};
use serde::Deserialize;
use serde_json::json;

use crate::db::exchange_rates::ExchangeRate;
use crate::error::AppError;
use crate::middleware::RequireSession;
use crate::services::rates::RateSnapshot;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/rates/latest", get(latest))
        .route("/api/rates/history", get(history))
        .route("/api/rates/refresh", post(refresh))
}

#[derive(Debug, Deserialize)]
struct PairQuery {
    /// `BASE/QUOTE`, e.g. `USD/JPY`. Defaults to USD/JPY.
    pair: Option<String>,
    limit: Option<i64>,
}

fn parse_pair(query: &PairQuery) -> Result<CurrencyPair, AppError> {
    match &query.pair {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::BadRequest(format!("invalid pair: {e}"))),
        None => Ok(CurrencyPair::new(Currency::USD, Currency::JPY)),
    }
}

/// Current rate for a pair: cache, then provider, then newest stored row.
async fn latest(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
    Query(query): Query<PairQuery>,
) -> Result<Json<RateSnapshot>, AppError> {
    let pair = parse_pair(&query)?;
    Ok(Json(state.rates().latest(pair).await?))
}

/// Stored observations for a pair, newest first.
async fn history(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
    Query(query): Query<PairQuery>,
) -> Result<Json<Vec<ExchangeRate>>, AppError> {
    let pair = parse_pair(&query)?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 1000);
    Ok(Json(state.rates().history(pair, limit).await?))
}

/// Force a provider fetch for every configured pair.
async fn refresh(
    RequireSession(session): RequireSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<RateSnapshot>>, AppError> {
    let snapshots = state.rates().refresh().await?;

    state
        .audit()
        .record(
            &session.label,
            "rates.refresh",
            None,
            json!({ "pairs": snapshots.len() }),
        )
        .await;

    Ok(Json(snapshots))
}
