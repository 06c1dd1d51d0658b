//! Exchange-rate fetching, storage, and cache.
//!
//! Reads go through the Redis `ExchangeRates` namespace (1h TTL) and fall
//! back to the newest stored rate when the provider is down. Refreshes,
//! periodic or operator-triggered, bypass both caches, persist a history
//! row per pair, and invalidate the namespace.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rakuda_core::{Currency, CurrencyPair};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use crate::cache::{CacheNamespace, CacheService};
use crate::db::exchange_rates::{self, ExchangeRate};
use crate::error::AppError;
use crate::fx::RateClient;

/// Where a served rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Fetched from the provider (possibly via the Redis cache).
    Provider,
    /// Provider unreachable; newest stored history row.
    Stored,
}

/// A rate as the API serves it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// The currency pair, quote units per base unit.
    pub pair: CurrencyPair,
    /// The rate.
    pub rate: Decimal,
    /// When the rate was fetched from the provider.
    pub fetched_at: DateTime<Utc>,
    /// Provider or stored fallback.
    pub source: RateSource,
}

impl RateSnapshot {
    fn stored(row: &ExchangeRate) -> Self {
        Self {
            pair: row.pair,
            rate: row.rate,
            fetched_at: row.fetched_at,
            source: RateSource::Stored,
        }
    }
}

/// Exchange-rate service: provider client + history table + Redis cache.
#[derive(Debug, Clone)]
pub struct RatesService {
    pool: PgPool,
    client: RateClient,
    cache: CacheService,
    pairs: Vec<CurrencyPair>,
}

impl RatesService {
    /// Create a new rates service tracking the configured pairs.
    #[must_use]
    pub const fn new(
        pool: PgPool,
        client: RateClient,
        cache: CacheService,
        pairs: Vec<CurrencyPair>,
    ) -> Self {
        Self {
            pool,
            client,
            cache,
            pairs,
        }
    }

    /// Current rate for a pair.
    ///
    /// Served from the Redis cache when fresh; on a miss the provider is
    /// asked and the observation appended to history. When the provider
    /// is unreachable the newest stored rate is served uncached, so the
    /// next request retries the provider.
    ///
    /// # Errors
    ///
    /// Returns error when the provider fails and no stored rate exists,
    /// or when the history lookup itself fails.
    #[instrument(skip(self), fields(pair = %pair))]
    pub async fn latest(&self, pair: CurrencyPair) -> Result<RateSnapshot, AppError> {
        let fetched = self
            .cache
            .get_or_fetch(
                CacheNamespace::ExchangeRates,
                Some(&pair.to_string()),
                || async { self.fetch_and_store(pair).await },
            )
            .await;

        match fetched {
            Ok(snapshot) => Ok(snapshot),
            Err(AppError::Rates(e)) => {
                warn!(error = %e, "Rate provider unavailable, trying stored rates");
                let stored = exchange_rates::latest(&self.pool, pair).await?;
                stored
                    .as_ref()
                    .map(RateSnapshot::stored)
                    .ok_or(AppError::Rates(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Current USD/JPY rate, the one the pricing formula runs on.
    ///
    /// # Errors
    ///
    /// Returns error when neither the provider nor stored history can
    /// supply the rate.
    pub async fn usd_jpy(&self) -> Result<Decimal, AppError> {
        let pair = CurrencyPair::new(Currency::USD, Currency::JPY);
        Ok(self.latest(pair).await?.rate)
    }

    /// Force-refresh every configured pair from the provider.
    ///
    /// Persists a history row per pair and invalidates the
    /// `ExchangeRates` cache namespace. Unlike [`latest`](Self::latest)
    /// this is a mutation: any provider, database, or cache failure
    /// propagates.
    ///
    /// # Errors
    ///
    /// Returns error if any pair cannot be fetched or stored.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<RateSnapshot>, AppError> {
        let mut snapshots = Vec::with_capacity(self.pairs.len());

        for &pair in &self.pairs {
            // Evict the in-process copy so the provider is actually asked.
            self.client.evict(pair).await;
            let rate = self.client.fetch_rate(pair).await?;
            let row = exchange_rates::record(&self.pool, pair, rate).await?;

            snapshots.push(RateSnapshot {
                pair,
                rate,
                fetched_at: row.fetched_at,
                source: RateSource::Provider,
            });
        }

        let invalidated = self
            .cache
            .invalidate_namespace(CacheNamespace::ExchangeRates)
            .await?;
        info!(
            pairs = snapshots.len(),
            invalidated, "Exchange rates refreshed"
        );

        Ok(snapshots)
    }

    /// Stored rate history for a pair, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    pub async fn history(
        &self,
        pair: CurrencyPair,
        limit: i64,
    ) -> Result<Vec<ExchangeRate>, AppError> {
        Ok(exchange_rates::history(&self.pool, pair, limit).await?)
    }

    /// Periodic refresh loop. Runs until the shutdown signal flips.
    pub async fn run(self, interval_secs: u64, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        error!(error = %e, "Scheduled rate refresh failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("Rate refresh task stopping");
                    return;
                }
            }
        }
    }

    async fn fetch_and_store(&self, pair: CurrencyPair) -> Result<RateSnapshot, AppError> {
        let rate = self.client.fetch_rate(pair).await?;

        // History also fills from the periodic refresh; an append failing
        // here must not take the read down with it.
        if let Err(e) = exchange_rates::record(&self.pool, pair, rate).await {
            warn!(pair = %pair, error = %e, "Failed to append exchange-rate history");
        }

        Ok(RateSnapshot {
            pair,
            rate,
            fetched_at: Utc::now(),
            source: RateSource::Provider,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_snapshot_serializes_source() {
        let snapshot = RateSnapshot {
            pair: CurrencyPair::new(Currency::USD, Currency::JPY),
            rate: Decimal::new(14_732, 2),
            fetched_at: Utc::now(),
            source: RateSource::Stored,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["source"], "stored");
        assert_eq!(json["rate"], "147.32");
    }
}
