//! Pricing recommendations and marketplace price pushes.
//!
//! The bulk generator walks every active listing with a strategy, joins
//! competitor stats and the current USD/JPY rate, and quotes a price per
//! listing. Applying a recommendation pushes to the marketplace first,
//! then updates the listing and price history in one transaction, so a
//! rejected push leaves local state untouched.

use chrono::Duration;
use rakuda_core::{ListingId, ListingStatus, Marketplace};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::cache::{CacheNamespace, CacheService};
use crate::db::competitor_prices;
use crate::db::listings::{self, Listing, RepricingListing};
use crate::db::products;
use crate::ebay::EbayClient;
use crate::error::AppError;
use crate::pricing::{PriceInputs, PricingStrategy, Quote, recommend_price};
use crate::services::audit::AuditService;
use crate::services::rates::RatesService;

/// Lookback window for competitor observations feeding a quote.
const COMPETITOR_WINDOW_HOURS: i64 = 24;

/// One row of the bulk recommendation output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRecommendation {
    /// Listing the quote is for.
    pub listing_id: ListingId,
    /// Product SKU.
    pub sku: String,
    /// Listing title.
    pub title: String,
    /// Marketplace the listing is on.
    pub marketplace: Marketplace,
    /// Strategy that produced the quote.
    pub strategy: PricingStrategy,
    /// Asking price before the quote.
    pub current_price_usd: Decimal,
    /// Quoted price.
    pub recommended_price_usd: Decimal,
    /// Margin realized at the quoted price, percent.
    pub expected_margin_pct: Decimal,
    /// Why the strategy picked this price.
    pub rationale: String,
    /// Competitor observations inside the lookback window.
    pub competitor_samples: i64,
}

/// The result of applying a recommendation.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedPrice {
    /// The listing after the update.
    pub listing: Listing,
    /// Price before the change.
    pub old_price_usd: Decimal,
    /// Price after the change.
    pub new_price_usd: Decimal,
    /// Margin realized at the new price, percent.
    pub margin_pct: Decimal,
    /// Strategy that produced the price.
    pub strategy: PricingStrategy,
    /// Why the strategy picked this price.
    pub rationale: String,
}

/// Pricing automation service.
#[derive(Debug, Clone)]
pub struct RepricerService {
    pool: PgPool,
    rates: RatesService,
    cache: CacheService,
    ebay: Option<EbayClient>,
    audit: AuditService,
}

impl RepricerService {
    /// Create a new repricer.
    ///
    /// Without an eBay client, `apply` updates local state only.
    #[must_use]
    pub const fn new(
        pool: PgPool,
        rates: RatesService,
        cache: CacheService,
        ebay: Option<EbayClient>,
        audit: AuditService,
    ) -> Self {
        Self {
            pool,
            rates,
            cache,
            ebay,
            audit,
        }
    }

    /// Recommendations for every active listing with a strategy.
    ///
    /// Cached under the `PricingRecommendations` namespace (15m); applying
    /// a price invalidates it.
    ///
    /// # Errors
    ///
    /// Returns error if listings, competitor stats, or the exchange rate
    /// cannot be loaded.
    pub async fn recommendations(&self) -> Result<Vec<PriceRecommendation>, AppError> {
        self.cache
            .get_or_fetch(CacheNamespace::PricingRecommendations, None, || async {
                self.build_recommendations().await
            })
            .await
    }

    #[instrument(skip(self))]
    async fn build_recommendations(&self) -> Result<Vec<PriceRecommendation>, AppError> {
        let candidates = listings::active_for_repricing(&self.pool).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let stats_by_listing = competitor_prices::stats_by_listing(
            &self.pool,
            Duration::hours(COMPETITOR_WINDOW_HOURS),
        )
        .await?;
        let usd_jpy = self.rates.usd_jpy().await?;

        let mut recommendations = Vec::with_capacity(candidates.len());
        for listing in candidates {
            let Some(strategy) = listing.strategy else {
                continue;
            };

            let stats = stats_by_listing.get(&listing.id);
            let inputs = price_inputs(&listing, usd_jpy);
            let quote = match recommend_price(strategy, &inputs, stats) {
                Ok(quote) => quote,
                Err(e) => {
                    // One listing with broken cost data must not empty the page.
                    warn!(listing_id = %listing.id, error = %e, "Skipping unquotable listing");
                    continue;
                }
            };

            recommendations.push(PriceRecommendation {
                listing_id: listing.id,
                sku: listing.sku,
                title: listing.title,
                marketplace: listing.marketplace,
                strategy,
                current_price_usd: listing.price_usd,
                recommended_price_usd: quote.price_usd,
                expected_margin_pct: quote.margin_pct,
                rationale: quote.rationale,
                competitor_samples: stats.map_or(0, |s| s.samples),
            });
        }

        info!(count = recommendations.len(), "Built pricing recommendations");
        Ok(recommendations)
    }

    /// Quote and apply a price for one listing.
    ///
    /// Order of operations: quote, push to the marketplace (when the
    /// listing is published and a client is configured), then update the
    /// listing and write price history in one transaction, invalidate the
    /// recommendation and dashboard caches, and audit.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing listing, `Conflict` for inactive
    /// or strategy-less listings, 502 when the marketplace rejects the
    /// push, and propagates database and cache invalidation failures.
    #[instrument(skip(self), fields(listing_id = %listing_id, actor = %actor))]
    pub async fn apply(&self, listing_id: ListingId, actor: &str) -> Result<AppliedPrice, AppError> {
        let listing = listings::get(&self.pool, listing_id).await?;

        if listing.status != ListingStatus::Active {
            return Err(AppError::Conflict(format!(
                "listing {listing_id} is {:?}, only active listings can be repriced",
                listing.status
            )));
        }
        let Some(strategy) = listing.strategy else {
            return Err(AppError::Conflict(format!(
                "listing {listing_id} has no pricing strategy"
            )));
        };

        let product = products::get(&self.pool, listing.product_id).await?;
        // Single-listing stats are read through their namespace (30m);
        // the bulk pass joins everything in one query instead.
        let stats = self
            .cache
            .get_or_fetch(
                CacheNamespace::CompetitorPrices,
                Some(&listing_id.to_string()),
                || async {
                    competitor_prices::stats_for(
                        &self.pool,
                        listing_id,
                        Duration::hours(COMPETITOR_WINDOW_HOURS),
                    )
                    .await
                    .map_err(AppError::from)
                },
            )
            .await?;
        let usd_jpy = self.rates.usd_jpy().await?;

        let inputs = PriceInputs {
            cost_jpy: product.cost_jpy,
            shipping_usd: listing.shipping_usd,
            fee_rate: listing.fee_rate,
            target_margin_pct: listing.target_margin_pct,
            usd_jpy_rate: usd_jpy,
        };
        let quote: Quote = recommend_price(strategy, &inputs, stats.as_ref())?;

        // Marketplace first: a rejected push must leave local state untouched.
        if let Some(ebay) = &self.ebay
            && let Some(external_id) = &listing.external_id
        {
            ebay.revise_listing_price(external_id, &product.sku, quote.price_usd)
                .await?;
        }

        let (updated, old_price) = listings::apply_price(
            &self.pool,
            listing_id,
            quote.price_usd,
            Some(quote.margin_pct),
            Some(strategy),
            actor,
        )
        .await?;

        self.cache
            .invalidate_namespace(CacheNamespace::PricingRecommendations)
            .await?;
        self.cache
            .invalidate(CacheNamespace::DashboardStats, None)
            .await?;

        self.audit
            .record(
                actor,
                "pricing.apply",
                Some(&format!("listing:{listing_id}")),
                json!({
                    "old_price_usd": old_price,
                    "new_price_usd": quote.price_usd,
                    "margin_pct": quote.margin_pct,
                    "strategy": strategy,
                    "rationale": quote.rationale,
                }),
            )
            .await;

        info!(
            old_price = %old_price,
            new_price = %quote.price_usd,
            strategy = %strategy,
            "Price applied"
        );

        Ok(AppliedPrice {
            listing: updated,
            old_price_usd: old_price,
            new_price_usd: quote.price_usd,
            margin_pct: quote.margin_pct,
            strategy,
            rationale: quote.rationale,
        })
    }
}

fn price_inputs(listing: &RepricingListing, usd_jpy: Decimal) -> PriceInputs {
    PriceInputs {
        cost_jpy: listing.cost_jpy,
        shipping_usd: listing.shipping_usd,
        fee_rate: listing.fee_rate,
        target_margin_pct: listing.target_margin_pct,
        usd_jpy_rate: usd_jpy,
    }
}
