//! Back-office dashboard endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rakuda_core::{Currency, CurrencyPair, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::CacheNamespace;
use crate::db::{listings, orders, products, shipments};
use crate::error::AppError;
use crate::middleware::RequireSession;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard/stats", get(stats))
}

/// Aggregate counters for the back-office landing view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Listings currently active across marketplaces.
    pub active_listings: i64,
    /// Paid orders awaiting shipment.
    pub pending_shipments: i64,
    /// Non-cancelled orders created this month.
    pub mtd_orders: i64,
    /// Revenue over those orders, USD.
    pub mtd_revenue_usd: Decimal,
    /// The same revenue in yen at the current rate, for reconciling
    /// against supplier-side spend; `None` when no rate is obtainable.
    pub mtd_revenue_jpy: Option<Decimal>,
    /// Products at or below their low-stock threshold.
    pub low_stock_products: i64,
    /// Current USD/JPY rate; `None` when no rate is obtainable.
    pub usd_jpy: Option<Decimal>,
}

/// Dashboard counters, cached for five minutes.
async fn stats(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    let stats = state
        .cache()
        .get_or_fetch(CacheNamespace::DashboardStats, None, || async {
            build_stats(&state).await
        })
        .await?;
    Ok(Json(stats))
}

async fn build_stats(state: &AppState) -> Result<DashboardStats, AppError> {
    let pool = state.pool();
    let active_listings = listings::count_active(pool).await?;
    let pending_shipments = shipments::count_pending(pool).await?;
    let mtd = orders::month_to_date(pool).await?;
    let low_stock_products = products::count_low_stock(pool).await?;

    // The rate is decoration on this view; a dead provider with an empty
    // history table must not blank the whole dashboard.
    let usd_jpy = match state.rates().usd_jpy().await {
        Ok(rate) => Some(rate),
        Err(e) => {
            warn!(error = %e, "Dashboard serving without a USD/JPY rate");
            None
        }
    };

    Ok(DashboardStats {
        active_listings,
        pending_shipments,
        mtd_orders: mtd.orders,
        mtd_revenue_usd: mtd.revenue_usd,
        mtd_revenue_jpy: usd_jpy.and_then(|rate| revenue_in_jpy(mtd.revenue_usd, rate)),
        low_stock_products,
        usd_jpy,
    })
}

/// Convert a USD revenue figure to whole yen at the given USD/JPY rate.
fn revenue_in_jpy(revenue_usd: Decimal, rate: Decimal) -> Option<Decimal> {
    Money::new(revenue_usd, Currency::USD)
        .convert(CurrencyPair::new(Currency::USD, Currency::JPY), rate)
        .ok()
        .map(|yen| yen.rounded().amount)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn revenue_converts_to_whole_yen() {
        // 1234.56 * 147.18 = 181,702.5408, rounded to whole yen
        assert_eq!(
            revenue_in_jpy(dec("1234.56"), dec("147.18")),
            Some(dec("181703"))
        );
    }

    #[test]
    fn zero_revenue_is_zero_yen() {
        assert_eq!(revenue_in_jpy(Decimal::ZERO, dec("147.18")), Some(dec("0")));
    }
}
