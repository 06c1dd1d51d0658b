//! eBay sell-API client with in-memory token caching.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::EbayError;
use super::auth::{EbayToken, mint_token};

use crate::config::EbayConfig;

/// Client for the eBay sell APIs.
///
/// Tokens are minted lazily on first use and re-minted shortly before
/// they expire; concurrent callers share one token.
#[derive(Clone)]
pub struct EbayClient {
    inner: Arc<EbayClientInner>,
}

struct EbayClientInner {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: SecretString,
    /// In-memory token cache
    token: RwLock<Option<EbayToken>>,
}

#[derive(Debug, Deserialize)]
struct BulkPriceResponse {
    #[serde(default)]
    responses: Vec<OfferPriceResponse>,
}

#[derive(Debug, Deserialize)]
struct OfferPriceResponse {
    #[serde(rename = "statusCode")]
    status_code: u16,
    #[serde(rename = "offerId", default)]
    offer_id: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl EbayClient {
    /// Create a client from the eBay configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &EbayConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(EbayClientInner {
                http,
                api_base: config.api_base.trim_end_matches('/').to_string(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                token: RwLock::new(None),
            }),
        }
    }

    /// Push a revised price to a live offer.
    ///
    /// # Errors
    ///
    /// Returns [`EbayError::Api`] if eBay rejects the revision,
    /// `RateLimited` on 429, `Http` on transport failures.
    #[instrument(skip(self), fields(offer_id = %offer_id, sku = %sku, price = %price_usd))]
    pub async fn revise_listing_price(
        &self,
        offer_id: &str,
        sku: &str,
        price_usd: Decimal,
    ) -> Result<(), EbayError> {
        let bearer = self.bearer().await?;

        let body = json!({
            "requests": [{
                "sku": sku,
                "offers": [{
                    "offerId": offer_id,
                    "price": { "currency": "USD", "value": price_usd.to_string() },
                }],
            }],
        });

        let response = self
            .inner
            .http
            .post(format!(
                "{}/sell/inventory/v1/bulk_update_price_quantity",
                self.inner.api_base
            ))
            .bearer_auth(bearer.expose_secret())
            .json(&body)
            .send()
            .await?;

        let response = Self::check_rate_limit(response)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EbayError::Api {
                status: status.as_u16(),
                message: body.chars().take(300).collect(),
            });
        }

        // Bulk endpoints answer 200 with per-offer statuses.
        let parsed: BulkPriceResponse = response.json().await?;
        for offer in &parsed.responses {
            if offer.status_code >= 400 {
                let message = offer
                    .errors
                    .iter()
                    .filter_map(|e| e.message.as_deref())
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(EbayError::Api {
                    status: offer.status_code,
                    message: if message.is_empty() {
                        format!(
                            "offer {} rejected",
                            offer.offer_id.as_deref().unwrap_or(offer_id)
                        )
                    } else {
                        message
                    },
                });
            }
        }

        debug!("price revision accepted");
        Ok(())
    }

    /// Send a message to the buyer of an order.
    ///
    /// # Errors
    ///
    /// Returns [`EbayError::Api`] if eBay rejects the message,
    /// `RateLimited` on 429, `Http` on transport failures.
    #[instrument(skip(self, body), fields(order_id = %order_external_id))]
    pub async fn send_buyer_message(
        &self,
        order_external_id: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EbayError> {
        let bearer = self.bearer().await?;

        let response = self
            .inner
            .http
            .post(format!(
                "{}/sell/fulfillment/v1/order/{order_external_id}/send_message",
                self.inner.api_base
            ))
            .bearer_auth(bearer.expose_secret())
            .json(&json!({ "subject": subject, "body": body }))
            .send()
            .await?;

        let response = Self::check_rate_limit(response)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EbayError::Api {
                status: status.as_u16(),
                message: body.chars().take(300).collect(),
            });
        }

        debug!("buyer message accepted");
        Ok(())
    }

    /// A valid bearer token, minting a new one if the cached token is
    /// missing or about to expire.
    async fn bearer(&self) -> Result<SecretString, EbayError> {
        {
            let guard = self.inner.token.read().await;
            if let Some(token) = guard.as_ref()
                && !token.is_expired()
            {
                return Ok(token.access_token.clone());
            }
        }

        let mut guard = self.inner.token.write().await;
        // Another caller may have minted while we waited for the lock.
        if let Some(token) = guard.as_ref()
            && !token.is_expired()
        {
            return Ok(token.access_token.clone());
        }

        let token = mint_token(
            &self.inner.http,
            &self.inner.api_base,
            &self.inner.client_id,
            &self.inner.client_secret,
        )
        .await?;
        let access = token.access_token.clone();
        *guard = Some(token);
        Ok(access)
    }

    fn check_rate_limit(response: reqwest::Response) -> Result<reqwest::Response, EbayError> {
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(EbayError::RateLimited(retry_after));
        }
        Ok(response)
    }
}

impl std::fmt::Debug for EbayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EbayClient")
            .field("api_base", &self.inner.api_base)
            .field("client_id", &self.inner.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
