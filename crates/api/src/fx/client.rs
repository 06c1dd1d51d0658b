//! HTTP client for the exchange-rate provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rakuda_core::CurrencyPair;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::RatesConfig;

/// Errors from the exchange-rate provider.
#[derive(Debug, Error)]
pub enum RatesError {
    #[error("rate provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("provider response has no rate for {0}")]
    MissingRate(CurrencyPair),
}

/// Provider `/latest` response.
#[derive(Debug, Deserialize)]
struct LatestResponse {
    success: Option<bool>,
    #[serde(default)]
    rates: HashMap<String, Decimal>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Client for the external exchange-rate API.
///
/// Provider responses are cached in-process for 5 minutes so bursts of
/// conversions do not turn into bursts of provider calls. Persisting
/// rates and the hourly refresh schedule live a layer up, in the rates
/// service.
#[derive(Clone)]
pub struct RateClient {
    inner: Arc<RateClientInner>,
}

struct RateClientInner {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    cache: Cache<CurrencyPair, Decimal>,
}

impl RateClient {
    /// Create a client from the rates configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &RatesConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(RateClientInner {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key: config.api_key.clone(),
                cache,
            }),
        }
    }

    /// Current rate for the pair, from the provider or the 5-minute cache.
    ///
    /// # Errors
    ///
    /// Returns [`RatesError`] if the provider is unreachable, rejects the
    /// request, or answers without the requested quote currency.
    #[instrument(skip(self), fields(pair = %pair))]
    pub async fn fetch_rate(&self, pair: CurrencyPair) -> Result<Decimal, RatesError> {
        if let Some(rate) = self.inner.cache.get(&pair).await {
            debug!("rate served from in-process cache");
            return Ok(rate);
        }

        let mut query: Vec<(&str, String)> = vec![
            ("base", pair.base.code().to_string()),
            ("symbols", pair.quote.code().to_string()),
        ];
        if let Some(key) = &self.inner.api_key {
            query.push(("access_key", key.expose_secret().to_string()));
        }

        let response = self
            .inner
            .http
            .get(format!("{}/latest", self.inner.base_url))
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RatesError::Provider {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let parsed: LatestResponse = response.json().await?;
        if parsed.success == Some(false) {
            return Err(RatesError::Provider {
                status: status.as_u16(),
                body: parsed
                    .error
                    .map_or_else(|| "success=false".to_string(), |e| e.to_string()),
            });
        }

        let rate = parsed
            .rates
            .get(pair.quote.code())
            .copied()
            .ok_or(RatesError::MissingRate(pair))?;

        self.inner.cache.insert(pair, rate).await;
        debug!(%rate, "rate fetched from provider");
        Ok(rate)
    }

    /// Drop the in-process rate cache, forcing the next fetch to hit the
    /// provider. Used by the manual refresh endpoint.
    pub async fn evict(&self, pair: CurrencyPair) {
        self.inner.cache.invalidate(&pair).await;
    }
}

impl std::fmt::Debug for RateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateClient")
            .field("base_url", &self.inner.base_url)
            .field("api_key", &self.inner.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}
