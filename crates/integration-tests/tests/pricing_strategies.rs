//! Integration tests for the pricing engine and strategy selection.
//!
//! These exercise the full quote path (formula, strategy candidate,
//! margin floor) the same way the repricer service drives it, without a
//! database.

use rakuda_api::db::competitor_prices::CompetitorStats;
use rakuda_api::pricing::{
    MINIMUM_MARGIN_PCT, PriceInputs, PricingStrategy, calculate_margin, calculate_selling_price,
    recommend_price,
};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal literal")
}

/// Nendoroid-style fixture: 5,800 JPY cost at 145 JPY/USD is exactly
/// $40.00, which keeps the expected prices easy to follow.
/// Formula price at 15% margin: (40 + 8) / (1 - 0.1325 - 0.15) = 66.90.
/// Floor price at the 10% minimum margin: 48 / 0.7675 = 62.54.
fn inputs() -> PriceInputs {
    PriceInputs {
        cost_jpy: dec("5800"),
        shipping_usd: dec("8.00"),
        fee_rate: dec("0.1325"),
        target_margin_pct: dec("15"),
        usd_jpy_rate: dec("145"),
    }
}

fn stats(min: &str, avg: &str, max: &str, samples: i64) -> CompetitorStats {
    CompetitorStats {
        min_usd: dec(min),
        avg_usd: dec(avg),
        max_usd: dec(max),
        samples,
    }
}

// =============================================================================
// Formula Tests
// =============================================================================

#[test]
fn test_formula_price_realizes_target_margin() {
    let breakdown = calculate_selling_price(&inputs()).expect("price");
    assert_eq!(breakdown.selling_usd, dec("66.90"));

    // Realized margin differs from the target only by cent rounding
    let delta = (breakdown.margin_pct - dec("15")).abs();
    assert!(delta < dec("0.1"), "margin {} too far from 15", breakdown.margin_pct);
}

#[test]
fn test_breakdown_components_reconcile() {
    let b = calculate_selling_price(&inputs()).expect("price");
    assert_eq!(
        b.selling_usd - b.cost_usd - b.shipping_usd - b.fee_usd,
        b.profit_usd
    );
    assert_eq!(b.cost_usd, dec("40.00"));
}

#[test]
fn test_margin_is_inverse_of_price_formula() {
    let b = calculate_selling_price(&inputs()).expect("price");
    let margin = calculate_margin(
        b.selling_usd,
        dec("5800"),
        dec("145"),
        dec("8.00"),
        dec("0.1325"),
    )
    .expect("margin");
    assert!((margin - dec("15")).abs() < dec("0.1"));
}

#[test]
fn test_fee_plus_margin_at_hundred_percent_is_rejected() {
    let bad = PriceInputs {
        target_margin_pct: dec("90"),
        ..inputs()
    };
    assert!(calculate_selling_price(&bad).is_err());
}

// =============================================================================
// Strategy Tests (with competitor data)
// =============================================================================

#[test]
fn test_competitive_undercuts_cheapest_by_one_percent() {
    let quote = recommend_price(
        PricingStrategy::Competitive,
        &inputs(),
        Some(&stats("70.00", "74.00", "79.00", 3)),
    )
    .expect("quote");

    assert_eq!(quote.price_usd, dec("69.30"));
    assert!(quote.rationale.contains("1% under"));
}

#[test]
fn test_market_average_matches_mean() {
    let quote = recommend_price(
        PricingStrategy::MarketAverage,
        &inputs(),
        Some(&stats("61.00", "68.00", "75.00", 4)),
    )
    .expect("quote");

    assert_eq!(quote.price_usd, dec("68.00"));
}

#[test]
fn test_profit_maximize_takes_higher_of_formula_and_top_competitor() {
    // Top competitor above the formula price wins
    let quote = recommend_price(
        PricingStrategy::ProfitMaximize,
        &inputs(),
        Some(&stats("60.00", "70.00", "80.00", 5)),
    )
    .expect("quote");
    assert_eq!(quote.price_usd, dec("80.00"));

    // Formula price wins when competitors sit below it
    let quote = recommend_price(
        PricingStrategy::ProfitMaximize,
        &inputs(),
        Some(&stats("50.00", "55.00", "60.00", 5)),
    )
    .expect("quote");
    assert_eq!(quote.price_usd, dec("66.90"));
}

// =============================================================================
// Strategy Tests (markup / markdown)
// =============================================================================

#[test]
fn test_premium_marks_up_fifteen_percent() {
    let quote =
        recommend_price(PricingStrategy::Premium, &inputs(), None).expect("quote");
    // 66.90 * 1.15 = 76.935, rounded away from zero
    assert_eq!(quote.price_usd, dec("76.94"));
}

#[test]
fn test_penetration_markdown_is_caught_by_margin_floor() {
    // 66.90 * 0.90 = 60.21 would land under the 10% floor price (62.54)
    let quote =
        recommend_price(PricingStrategy::Penetration, &inputs(), None).expect("quote");

    let floor = calculate_selling_price(&PriceInputs {
        target_margin_pct: MINIMUM_MARGIN_PCT,
        ..inputs()
    })
    .expect("floor");

    assert_eq!(quote.price_usd, floor.selling_usd);
    assert_eq!(quote.price_usd, dec("62.54"));
    assert!(quote.rationale.contains("floor"));
}

#[test]
fn test_competitive_race_to_the_bottom_is_floored() {
    // Undercutting a $50 competitor would sell at a near-loss
    let quote = recommend_price(
        PricingStrategy::Competitive,
        &inputs(),
        Some(&stats("50.00", "52.00", "55.00", 2)),
    )
    .expect("quote");

    assert_eq!(quote.price_usd, dec("62.54"));
    assert!(quote.rationale.contains("floor"));
}

// =============================================================================
// Fallback Tests (no competitor data)
// =============================================================================

#[test]
fn test_competitor_strategies_fall_back_to_formula() {
    for strategy in [
        PricingStrategy::Competitive,
        PricingStrategy::MarketAverage,
        PricingStrategy::ProfitMaximize,
    ] {
        let quote = recommend_price(strategy, &inputs(), None).expect("quote");
        assert_eq!(quote.price_usd, dec("66.90"), "{strategy} fallback");
        assert!(quote.rationale.contains("no competitor data"));
    }
}

// =============================================================================
// Wire Format Tests
// =============================================================================

#[test]
fn test_strategy_json_spelling_matches_database_labels() {
    let json = serde_json::to_string(&PricingStrategy::ProfitMaximize).expect("serialize");
    assert_eq!(json, "\"profit_maximize\"");

    let parsed: PricingStrategy =
        serde_json::from_str("\"market_average\"").expect("deserialize");
    assert_eq!(parsed, PricingStrategy::MarketAverage);
}
