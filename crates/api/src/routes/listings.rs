//! Listing inventory endpoints.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use rakuda_core::{ListingId, ListingStatus, Marketplace};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use validator::{Validate, ValidationError};

use crate::cache::CacheNamespace;
use crate::db::listings::{self, Listing, ListingFilter, UpdateListing};
use crate::error::AppError;
use crate::middleware::{RequireSession, ValidatedJson};
use crate::pricing::PricingStrategy;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/listings", get(index))
        .route("/api/listings/{id}", get(show).patch(update))
}

#[derive(Debug, Default, Deserialize)]
struct ListingQuery {
    status: Option<ListingStatus>,
    marketplace: Option<Marketplace>,
}

/// Optional field updates for a listing. Absent fields are untouched.
#[derive(Debug, Deserialize, Validate)]
struct UpdateListingRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    title: Option<String>,
    #[validate(custom = "validate_positive_price")]
    price_usd: Option<Decimal>,
    status: Option<ListingStatus>,
    strategy: Option<PricingStrategy>,
    #[validate(custom = "validate_fee_rate")]
    fee_rate: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    shipping_usd: Option<Decimal>,
    #[validate(custom = "validate_margin_pct")]
    target_margin_pct: Option<Decimal>,
    #[validate(length(min = 1, max = 64, message = "must be 1-64 characters"))]
    external_id: Option<String>,
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_positive_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(rule_error("price", "must be positive"));
    }
    Ok(())
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(rule_error("amount", "must not be negative"));
    }
    Ok(())
}

fn validate_fee_rate(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value >= Decimal::ONE {
        return Err(rule_error("fee_rate", "must be a fraction in [0, 1)"));
    }
    Ok(())
}

fn validate_margin_pct(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value >= Decimal::ONE_HUNDRED {
        return Err(rule_error("margin", "must be a percentage in [0, 100)"));
    }
    Ok(())
}

/// Listing inventory, optionally filtered by status and marketplace.
async fn index(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Vec<Listing>>, AppError> {
    let filter = ListingFilter {
        status: query.status,
        marketplace: query.marketplace,
    };
    Ok(Json(listings::list(state.pool(), filter).await?))
}

/// One listing by ID.
async fn show(
    RequireSession(_session): RequireSession,
    State(state): State<AppState>,
    Path(id): Path<ListingId>,
) -> Result<Json<Listing>, AppError> {
    Ok(Json(listings::get(state.pool(), id).await?))
}

/// Apply optional field updates to a listing.
///
/// A price or status change drops the pricing-recommendation and
/// dashboard cache entries, since both are computed from listing state.
async fn update(
    RequireSession(session): RequireSession,
    State(state): State<AppState>,
    Path(id): Path<ListingId>,
    ValidatedJson(body): ValidatedJson<UpdateListingRequest>,
) -> Result<Json<Listing>, AppError> {
    let touches_cache = body.price_usd.is_some() || body.status.is_some();

    let params = UpdateListing {
        title: body.title,
        price_usd: body.price_usd,
        status: body.status,
        strategy: body.strategy,
        fee_rate: body.fee_rate,
        shipping_usd: body.shipping_usd,
        target_margin_pct: body.target_margin_pct,
        external_id: body.external_id,
    };
    let detail = json!({
        "title": params.title,
        "price_usd": params.price_usd,
        "status": params.status,
        "strategy": params.strategy,
        "fee_rate": params.fee_rate,
        "shipping_usd": params.shipping_usd,
        "target_margin_pct": params.target_margin_pct,
        "external_id": params.external_id,
    });

    let listing = listings::update(state.pool(), id, params).await?;

    if touches_cache {
        state
            .cache()
            .invalidate_namespace(CacheNamespace::PricingRecommendations)
            .await?;
        state
            .cache()
            .invalidate(CacheNamespace::DashboardStats, None)
            .await?;
    }

    state
        .audit()
        .record(
            &session.label,
            "listing.update",
            Some(&format!("listing:{id}")),
            detail,
        )
        .await;

    Ok(Json(listing))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_fee_rate_must_be_fraction() {
        assert!(validate_fee_rate(&dec("0")).is_ok());
        assert!(validate_fee_rate(&dec("0.1325")).is_ok());
        assert!(validate_fee_rate(&dec("1")).is_err());
        assert!(validate_fee_rate(&dec("-0.01")).is_err());
    }

    #[test]
    fn test_price_must_be_positive() {
        assert!(validate_positive_price(&dec("19.99")).is_ok());
        assert!(validate_positive_price(&dec("0")).is_err());
        assert!(validate_positive_price(&dec("-5")).is_err());
    }

    #[test]
    fn test_margin_is_a_percentage() {
        assert!(validate_margin_pct(&dec("30")).is_ok());
        assert!(validate_margin_pct(&dec("0")).is_ok());
        assert!(validate_margin_pct(&dec("100")).is_err());
    }
}
