//! Database operations for marketplace listings.

use chrono::{DateTime, Utc};
use rakuda_core::{ListingId, ListingStatus, Marketplace, ProductId};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

use crate::pricing::PricingStrategy;

/// A marketplace-specific offer for a product.
///
/// Each product can carry at most one listing per marketplace; the listing
/// owns its own price, status, and pricing-strategy settings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Listing {
    /// Unique listing ID.
    pub id: ListingId,
    /// Product this listing offers.
    pub product_id: ProductId,
    /// Marketplace the listing is published to.
    pub marketplace: Marketplace,
    /// Marketplace-side identifier (eBay offer ID), set once published.
    pub external_id: Option<String>,
    /// Buyer-facing title.
    pub title: String,
    /// Current asking price in USD.
    pub price_usd: Decimal,
    /// Lifecycle status.
    pub status: ListingStatus,
    /// Automated pricing strategy; `None` means manual pricing.
    pub strategy: Option<PricingStrategy>,
    /// Final-value fee rate charged by the marketplace (fraction).
    pub fee_rate: Decimal,
    /// Outbound shipping cost in USD borne by the seller.
    pub shipping_usd: Decimal,
    /// Margin percentage the repricer aims for.
    pub target_margin_pct: Decimal,
    /// When the listing was created.
    pub created_at: DateTime<Utc>,
    /// When the listing was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Optional field updates for a listing.
///
/// `None` fields are left untouched. Status changes are validated against
/// the listing state machine before the write.
#[derive(Debug, Default)]
pub struct UpdateListing {
    /// New title.
    pub title: Option<String>,
    /// New price in USD.
    pub price_usd: Option<Decimal>,
    /// New status (must be a legal transition).
    pub status: Option<ListingStatus>,
    /// New pricing strategy.
    pub strategy: Option<PricingStrategy>,
    /// New fee rate (fraction).
    pub fee_rate: Option<Decimal>,
    /// New shipping cost.
    pub shipping_usd: Option<Decimal>,
    /// New target margin percentage.
    pub target_margin_pct: Option<Decimal>,
    /// New marketplace-side identifier.
    pub external_id: Option<String>,
}

/// Filters for listing queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListingFilter {
    /// Only listings with this status.
    pub status: Option<ListingStatus>,
    /// Only listings on this marketplace.
    pub marketplace: Option<Marketplace>,
}

/// An active listing joined with its product, as the repricer consumes it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RepricingListing {
    /// Listing ID.
    pub id: ListingId,
    /// Product ID.
    pub product_id: ProductId,
    /// Marketplace.
    pub marketplace: Marketplace,
    /// Marketplace-side identifier, if published.
    pub external_id: Option<String>,
    /// Buyer-facing title.
    pub title: String,
    /// Current asking price in USD.
    pub price_usd: Decimal,
    /// Pricing strategy; `None` rows are skipped by the repricer.
    pub strategy: Option<PricingStrategy>,
    /// Fee rate (fraction).
    pub fee_rate: Decimal,
    /// Shipping cost in USD.
    pub shipping_usd: Decimal,
    /// Target margin percentage.
    pub target_margin_pct: Decimal,
    /// Supplier cost in JPY.
    pub cost_jpy: Decimal,
    /// Product SKU.
    pub sku: String,
}

const LISTING_COLUMNS: &str = "id, product_id, marketplace, external_id, title, price_usd, \
     status, strategy, fee_rate, shipping_usd, target_margin_pct, created_at, updated_at";

/// Get a listing by ID.
///
/// # Errors
///
/// Returns `NotFound` if the listing does not exist.
pub async fn get(pool: &PgPool, id: ListingId) -> Result<Listing, RepositoryError> {
    sqlx::query_as::<_, Listing>(&format!(
        r"
        SELECT {LISTING_COLUMNS}
        FROM listings
        WHERE id = $1
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// List listings, newest first, optionally filtered by status and marketplace.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn list(pool: &PgPool, filter: ListingFilter) -> Result<Vec<Listing>, RepositoryError> {
    let listings = sqlx::query_as::<_, Listing>(&format!(
        r"
        SELECT {LISTING_COLUMNS}
        FROM listings
        WHERE ($1::listing_status IS NULL OR status = $1)
          AND ($2::marketplace IS NULL OR marketplace = $2)
        ORDER BY created_at DESC
        "
    ))
    .bind(filter.status)
    .bind(filter.marketplace)
    .fetch_all(pool)
    .await?;

    Ok(listings)
}

/// Apply optional field updates to a listing.
///
/// The row is locked for the duration, so the status the transition is
/// validated against is the status the write lands on. Two racing
/// updates serialize; the loser is validated against the winner's
/// result, not a stale read.
///
/// # Errors
///
/// Returns `NotFound` if the listing does not exist, `Conflict` if the
/// requested status change is not a legal transition.
pub async fn update(
    pool: &PgPool,
    id: ListingId,
    params: UpdateListing,
) -> Result<Listing, RepositoryError> {
    let mut tx = pool.begin().await?;

    let current: Option<(ListingStatus,)> =
        sqlx::query_as("SELECT status FROM listings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let (current,) = current.ok_or(RepositoryError::NotFound)?;

    if let Some(next) = params.status
        && next != current
        && !current.can_transition_to(next)
    {
        return Err(RepositoryError::Conflict(format!(
            "illegal listing status transition: {current:?} -> {next:?}"
        )));
    }

    let listing = sqlx::query_as::<_, Listing>(&format!(
        r"
        UPDATE listings
        SET title = COALESCE($2, title),
            price_usd = COALESCE($3, price_usd),
            status = COALESCE($4, status),
            strategy = COALESCE($5, strategy),
            fee_rate = COALESCE($6, fee_rate),
            shipping_usd = COALESCE($7, shipping_usd),
            target_margin_pct = COALESCE($8, target_margin_pct),
            external_id = COALESCE($9, external_id),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {LISTING_COLUMNS}
        "
    ))
    .bind(id)
    .bind(params.title)
    .bind(params.price_usd)
    .bind(params.status)
    .bind(params.strategy)
    .bind(params.fee_rate)
    .bind(params.shipping_usd)
    .bind(params.target_margin_pct)
    .bind(params.external_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(listing)
}

/// Apply a new price to a listing and record the change in `price_history`,
/// atomically.
///
/// Returns the updated listing and the price it replaced.
///
/// # Errors
///
/// Returns `NotFound` if the listing does not exist.
pub async fn apply_price(
    pool: &PgPool,
    id: ListingId,
    new_price: Decimal,
    margin_pct: Option<Decimal>,
    strategy: Option<PricingStrategy>,
    changed_by: &str,
) -> Result<(Listing, Decimal), RepositoryError> {
    let mut tx = pool.begin().await?;

    let old_price: Option<(Decimal,)> =
        sqlx::query_as("SELECT price_usd FROM listings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let (old_price,) = old_price.ok_or(RepositoryError::NotFound)?;

    let listing = sqlx::query_as::<_, Listing>(&format!(
        r"
        UPDATE listings
        SET price_usd = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {LISTING_COLUMNS}
        "
    ))
    .bind(id)
    .bind(new_price)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r"
        INSERT INTO price_history (listing_id, old_price_usd, new_price_usd, margin_pct, strategy, changed_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(id)
    .bind(old_price)
    .bind(new_price)
    .bind(margin_pct)
    .bind(strategy)
    .bind(changed_by)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((listing, old_price))
}

/// Active listings joined with their products, for bulk repricing.
///
/// Listings without a strategy are excluded; they are priced manually.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn active_for_repricing(pool: &PgPool) -> Result<Vec<RepricingListing>, RepositoryError> {
    let listings = sqlx::query_as::<_, RepricingListing>(
        r"
        SELECT
            l.id, l.product_id, l.marketplace, l.external_id, l.title,
            l.price_usd, l.strategy, l.fee_rate, l.shipping_usd,
            l.target_margin_pct, p.cost_jpy, p.sku
        FROM listings l
        JOIN products p ON p.id = l.product_id
        WHERE l.status = 'active' AND l.strategy IS NOT NULL
        ORDER BY l.id
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(listings)
}

/// Count of active listings.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn count_active(pool: &PgPool) -> Result<i64, RepositoryError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM listings WHERE status = 'active'")
            .fetch_one(pool)
            .await?;

    Ok(count)
}
