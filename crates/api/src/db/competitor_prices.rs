//! Database operations for competitor price observations.
//!
//! Observations arrive from scrapers and marketplace searches; pricing
//! strategies consume them aggregated per listing over a recent window.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rakuda_core::ListingId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::RepositoryError;

/// A single observed competitor price.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CompetitorPrice {
    /// Row ID.
    pub id: i32,
    /// Listing the observation is comparable to.
    pub listing_id: ListingId,
    /// Where the observation came from.
    pub source: String,
    /// Observed price in USD.
    pub price_usd: Decimal,
    /// When the price was observed.
    pub observed_at: DateTime<Utc>,
}

/// Aggregated competitor prices for one listing.
///
/// Serializable both ways: single-listing stats round-trip through the
/// `CompetitorPrices` cache namespace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompetitorStats {
    /// Lowest observed price.
    pub min_usd: Decimal,
    /// Mean observed price.
    pub avg_usd: Decimal,
    /// Highest observed price.
    pub max_usd: Decimal,
    /// Number of observations in the window.
    pub samples: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    listing_id: ListingId,
    min_usd: Decimal,
    avg_usd: Decimal,
    max_usd: Decimal,
    samples: i64,
}

impl From<StatsRow> for CompetitorStats {
    fn from(row: StatsRow) -> Self {
        Self {
            min_usd: row.min_usd,
            avg_usd: row.avg_usd,
            max_usd: row.max_usd,
            samples: row.samples,
        }
    }
}

/// Record an observation.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn record(
    pool: &PgPool,
    listing_id: ListingId,
    source: &str,
    price_usd: Decimal,
) -> Result<CompetitorPrice, RepositoryError> {
    let observation = sqlx::query_as::<_, CompetitorPrice>(
        r"
        INSERT INTO competitor_prices (listing_id, source, price_usd)
        VALUES ($1, $2, $3)
        RETURNING id, listing_id, source, price_usd, observed_at
        ",
    )
    .bind(listing_id)
    .bind(source)
    .bind(price_usd)
    .fetch_one(pool)
    .await?;

    Ok(observation)
}

/// Aggregated stats for one listing over the given lookback window.
///
/// Returns `None` when no observations fall inside the window.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn stats_for(
    pool: &PgPool,
    listing_id: ListingId,
    window: Duration,
) -> Result<Option<CompetitorStats>, RepositoryError> {
    let row = sqlx::query_as::<_, StatsRow>(
        r"
        SELECT
            listing_id,
            MIN(price_usd) AS min_usd,
            AVG(price_usd) AS avg_usd,
            MAX(price_usd) AS max_usd,
            COUNT(*) AS samples
        FROM competitor_prices
        WHERE listing_id = $1 AND observed_at > NOW() - make_interval(secs => $2)
        GROUP BY listing_id
        ",
    )
    .bind(listing_id)
    .bind(window.num_seconds())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

/// Aggregated stats for every listing with observations in the window,
/// keyed by listing. One query backs a whole bulk-repricing pass.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn stats_by_listing(
    pool: &PgPool,
    window: Duration,
) -> Result<HashMap<ListingId, CompetitorStats>, RepositoryError> {
    let rows = sqlx::query_as::<_, StatsRow>(
        r"
        SELECT
            listing_id,
            MIN(price_usd) AS min_usd,
            AVG(price_usd) AS avg_usd,
            MAX(price_usd) AS max_usd,
            COUNT(*) AS samples
        FROM competitor_prices
        WHERE observed_at > NOW() - make_interval(secs => $1)
        GROUP BY listing_id
        ",
    )
    .bind(window.num_seconds())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.listing_id, row.into()))
        .collect())
}
