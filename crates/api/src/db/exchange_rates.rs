//! Database operations for fetched exchange rates.
//!
//! Every successful provider fetch appends a row, so `latest` is simply
//! the newest row per pair and the table doubles as rate history.

use chrono::{DateTime, Utc};
use rakuda_core::CurrencyPair;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// A stored exchange-rate observation.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRate {
    /// Row ID.
    pub id: i32,
    /// The currency pair, quoted as quote-units per base-unit.
    pub pair: CurrencyPair,
    /// The observed rate.
    pub rate: Decimal,
    /// When the rate was fetched from the provider.
    pub fetched_at: DateTime<Utc>,
}

/// Internal row type; `base`/`quote` live as CHAR(3) codes in Postgres.
#[derive(Debug, sqlx::FromRow)]
struct ExchangeRateRow {
    id: i32,
    base: String,
    quote: String,
    rate: Decimal,
    fetched_at: DateTime<Utc>,
}

impl TryFrom<ExchangeRateRow> for ExchangeRate {
    type Error = RepositoryError;

    fn try_from(row: ExchangeRateRow) -> Result<Self, Self::Error> {
        let base = row.base.trim().parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("exchange_rates.base: {e}"))
        })?;
        let quote = row.quote.trim().parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("exchange_rates.quote: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            pair: CurrencyPair::new(base, quote),
            rate: row.rate,
            fetched_at: row.fetched_at,
        })
    }
}

/// Record a freshly fetched rate.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn record(
    pool: &PgPool,
    pair: CurrencyPair,
    rate: Decimal,
) -> Result<ExchangeRate, RepositoryError> {
    let row = sqlx::query_as::<_, ExchangeRateRow>(
        r"
        INSERT INTO exchange_rates (base, quote, rate)
        VALUES ($1, $2, $3)
        RETURNING id, base, quote, rate, fetched_at
        ",
    )
    .bind(pair.base.code())
    .bind(pair.quote.code())
    .bind(rate)
    .fetch_one(pool)
    .await?;

    row.try_into()
}

/// The most recently fetched rate for a pair, if any exists.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn latest(
    pool: &PgPool,
    pair: CurrencyPair,
) -> Result<Option<ExchangeRate>, RepositoryError> {
    let row = sqlx::query_as::<_, ExchangeRateRow>(
        r"
        SELECT id, base, quote, rate, fetched_at
        FROM exchange_rates
        WHERE base = $1 AND quote = $2
        ORDER BY fetched_at DESC
        LIMIT 1
        ",
    )
    .bind(pair.base.code())
    .bind(pair.quote.code())
    .fetch_optional(pool)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Recent rate history for a pair, newest first.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn history(
    pool: &PgPool,
    pair: CurrencyPair,
    limit: i64,
) -> Result<Vec<ExchangeRate>, RepositoryError> {
    let rows = sqlx::query_as::<_, ExchangeRateRow>(
        r"
        SELECT id, base, quote, rate, fetched_at
        FROM exchange_rates
        WHERE base = $1 AND quote = $2
        ORDER BY fetched_at DESC
        LIMIT $3
        ",
    )
    .bind(pair.base.code())
    .bind(pair.quote.code())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}
