//! Strategy selection over the pricing formula.
//!
//! Every strategy feeds the same formula; they differ only in which input
//! drives the candidate price (competitor minimum, market average, the
//! formula's own output marked up or down). All candidates are clamped to
//! a minimum-margin floor so no strategy can price a listing at a loss.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::engine::{PriceInputs, PricingError, breakdown_at, calculate_selling_price, round_cents};

use crate::db::competitor_prices::CompetitorStats;

/// No strategy may price below this margin.
pub const MINIMUM_MARGIN_PCT: Decimal = Decimal::TEN;

/// How the repricer picks a price for a listing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "pricing_strategy", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PricingStrategy {
    /// Undercut the cheapest competitor by 1%.
    Competitive,
    /// The higher of the target-margin price and the top competitor price.
    ProfitMaximize,
    /// Match the competitor average.
    MarketAverage,
    /// 10% markdown from the target-margin price.
    Penetration,
    /// 15% markup over the target-margin price.
    Premium,
}

impl PricingStrategy {
    /// Database and JSON spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Competitive => "competitive",
            Self::ProfitMaximize => "profit_maximize",
            Self::MarketAverage => "market_average",
            Self::Penetration => "penetration",
            Self::Premium => "premium",
        }
    }
}

impl std::fmt::Display for PricingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recommended price with the margin it realizes and how it was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Recommended asking price in USD.
    pub price_usd: Decimal,
    /// Margin realized at that price.
    pub margin_pct: Decimal,
    /// Operator-facing explanation of where the number came from.
    pub rationale: String,
}

/// Pick a price for one listing.
///
/// Competitor-driven strategies fall back to the target-margin formula
/// when no observations exist. Whatever the strategy proposes, the result
/// never drops below the [`MINIMUM_MARGIN_PCT`] floor price.
///
/// # Errors
///
/// Propagates [`PricingError`] from the underlying formula (degenerate
/// cost or rate, fee plus margin at or past 100%).
pub fn recommend_price(
    strategy: PricingStrategy,
    inputs: &PriceInputs,
    competitors: Option<&CompetitorStats>,
) -> Result<Quote, PricingError> {
    let formula = calculate_selling_price(inputs)?;
    let floor = calculate_selling_price(&PriceInputs {
        target_margin_pct: MINIMUM_MARGIN_PCT,
        ..*inputs
    })?;

    let (candidate, mut rationale) = match (strategy, competitors) {
        (PricingStrategy::Competitive, Some(stats)) => (
            stats.min_usd * Decimal::new(99, 2),
            format!(
                "1% under the lowest of {} competitor prices (${})",
                stats.samples, stats.min_usd
            ),
        ),
        (PricingStrategy::MarketAverage, Some(stats)) => (
            stats.avg_usd,
            format!("matched the average of {} competitor prices", stats.samples),
        ),
        (PricingStrategy::ProfitMaximize, Some(stats)) => (
            formula.selling_usd.max(stats.max_usd),
            format!(
                "higher of the {}% margin price and the top competitor price (${})",
                inputs.target_margin_pct, stats.max_usd
            ),
        ),
        (
            PricingStrategy::Competitive
            | PricingStrategy::MarketAverage
            | PricingStrategy::ProfitMaximize,
            None,
        ) => (
            formula.selling_usd,
            format!(
                "no competitor data, {}% margin formula price",
                inputs.target_margin_pct
            ),
        ),
        (PricingStrategy::Penetration, _) => (
            formula.selling_usd * Decimal::new(90, 2),
            "10% markdown from the formula price".to_string(),
        ),
        (PricingStrategy::Premium, _) => (
            formula.selling_usd * Decimal::new(115, 2),
            "15% markup over the formula price".to_string(),
        ),
    };

    let candidate = round_cents(candidate);
    let price = if candidate < floor.selling_usd {
        rationale.push_str(&format!(
            ", raised to the {MINIMUM_MARGIN_PCT}% margin floor"
        ));
        floor.selling_usd
    } else {
        candidate
    };

    let breakdown = breakdown_at(price, inputs)?;
    Ok(Quote {
        price_usd: breakdown.selling_usd,
        margin_pct: breakdown.margin_pct,
        rationale,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pricing::calculate_margin;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn inputs() -> PriceInputs {
        // formula price 34.84, floor price (10% margin) 32.57
        PriceInputs {
            cost_jpy: dec("3000"),
            shipping_usd: dec("5"),
            fee_rate: dec("0.1325"),
            target_margin_pct: dec("15"),
            usd_jpy_rate: dec("150"),
        }
    }

    fn stats(min: &str, avg: &str, max: &str) -> CompetitorStats {
        CompetitorStats {
            min_usd: dec(min),
            avg_usd: dec(avg),
            max_usd: dec(max),
            samples: 4,
        }
    }

    #[test]
    fn competitive_undercuts_the_minimum() {
        let quote = recommend_price(
            PricingStrategy::Competitive,
            &inputs(),
            Some(&stats("40.00", "43.00", "46.00")),
        )
        .unwrap();
        assert_eq!(quote.price_usd, dec("39.60"));
        assert!(quote.rationale.contains("under the lowest"));
    }

    #[test]
    fn competitive_clamps_to_the_margin_floor() {
        // 1% under $30 is $29.70, below the $32.57 floor
        let quote = recommend_price(
            PricingStrategy::Competitive,
            &inputs(),
            Some(&stats("30.00", "33.00", "36.00")),
        )
        .unwrap();
        assert_eq!(quote.price_usd, dec("32.57"));
        assert!(quote.rationale.contains("margin floor"));
    }

    #[test]
    fn market_average_matches_the_average() {
        let quote = recommend_price(
            PricingStrategy::MarketAverage,
            &inputs(),
            Some(&stats("30.00", "33.00", "36.00")),
        )
        .unwrap();
        assert_eq!(quote.price_usd, dec("33.00"));
    }

    #[test]
    fn profit_maximize_takes_the_higher_price() {
        let above = recommend_price(
            PricingStrategy::ProfitMaximize,
            &inputs(),
            Some(&stats("30.00", "33.00", "36.00")),
        )
        .unwrap();
        assert_eq!(above.price_usd, dec("36.00"));

        // top competitor below the formula price changes nothing
        let below = recommend_price(
            PricingStrategy::ProfitMaximize,
            &inputs(),
            Some(&stats("28.00", "29.00", "30.00")),
        )
        .unwrap();
        assert_eq!(below.price_usd, dec("34.84"));
    }

    #[test]
    fn penetration_marks_down_but_respects_the_floor() {
        // 34.84 * 0.90 = 31.36, below the floor
        let clamped = recommend_price(PricingStrategy::Penetration, &inputs(), None).unwrap();
        assert_eq!(clamped.price_usd, dec("32.57"));

        // a high-margin listing has room to mark down
        let mut rich = inputs();
        rich.target_margin_pct = dec("40");
        let quote = recommend_price(PricingStrategy::Penetration, &rich, None).unwrap();
        assert_eq!(quote.price_usd, dec("48.13"));
    }

    #[test]
    fn premium_marks_up() {
        let quote = recommend_price(PricingStrategy::Premium, &inputs(), None).unwrap();
        assert_eq!(quote.price_usd, dec("40.07"));
    }

    #[test]
    fn competitor_strategies_fall_back_to_the_formula() {
        for strategy in [
            PricingStrategy::Competitive,
            PricingStrategy::MarketAverage,
            PricingStrategy::ProfitMaximize,
        ] {
            let quote = recommend_price(strategy, &inputs(), None).unwrap();
            assert_eq!(quote.price_usd, dec("34.84"), "{strategy}");
            assert!(quote.rationale.contains("no competitor data"));
        }
    }

    #[test]
    fn quote_margin_agrees_with_the_inverse_formula() {
        let i = inputs();
        let quote = recommend_price(
            PricingStrategy::Competitive,
            &i,
            Some(&stats("40.00", "43.00", "46.00")),
        )
        .unwrap();
        let margin = calculate_margin(
            quote.price_usd,
            i.cost_jpy,
            i.usd_jpy_rate,
            i.shipping_usd,
            i.fee_rate,
        )
        .unwrap();
        assert_eq!(quote.margin_pct, margin);
    }

    #[test]
    fn every_strategy_meets_the_minimum_margin() {
        // competitor prices low enough to drag every candidate down
        let cheap = stats("20.00", "21.00", "22.00");
        for strategy in [
            PricingStrategy::Competitive,
            PricingStrategy::ProfitMaximize,
            PricingStrategy::MarketAverage,
            PricingStrategy::Penetration,
            PricingStrategy::Premium,
        ] {
            let quote = recommend_price(strategy, &inputs(), Some(&cheap)).unwrap();
            assert!(
                quote.margin_pct >= dec("9.95"),
                "{strategy} priced at {} ({}%)",
                quote.price_usd,
                quote.margin_pct
            );
        }
    }

    #[test]
    fn strategy_serializes_snake_case() {
        let json = serde_json::to_string(&PricingStrategy::ProfitMaximize).unwrap();
        assert_eq!(json, "\"profit_maximize\"");
        let back: PricingStrategy = serde_json::from_str("\"market_average\"").unwrap();
        assert_eq!(back, PricingStrategy::MarketAverage);
    }
}
