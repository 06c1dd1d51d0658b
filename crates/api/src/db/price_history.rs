//! Read side of applied price changes.
//!
//! Rows are written by `listings::apply_price` in the same transaction as
//! the price update itself.

use chrono::{DateTime, Utc};
use rakuda_core::ListingId;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

use crate::pricing::PricingStrategy;

/// One applied price change.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PriceChange {
    /// Row ID.
    pub id: i64,
    /// Listing the price changed on.
    pub listing_id: ListingId,
    /// Price before the change, USD.
    pub old_price_usd: Decimal,
    /// Price after the change, USD.
    pub new_price_usd: Decimal,
    /// Margin realized at the new price, percent.
    pub margin_pct: Option<Decimal>,
    /// Strategy that produced the price, if automated.
    pub strategy: Option<PricingStrategy>,
    /// Who applied it (operator label or `repricer`).
    pub changed_by: String,
    /// When the change was applied.
    pub created_at: DateTime<Utc>,
}

/// Price changes for a listing, newest first.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn for_listing(
    pool: &PgPool,
    listing_id: ListingId,
    limit: i64,
) -> Result<Vec<PriceChange>, RepositoryError> {
    let changes = sqlx::query_as::<_, PriceChange>(
        r"
        SELECT id, listing_id, old_price_usd, new_price_usd, margin_pct,
               strategy, changed_by, created_at
        FROM price_history
        WHERE listing_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        ",
    )
    .bind(listing_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(changes)
}
