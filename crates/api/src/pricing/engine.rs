//! Closed-form selling-price arithmetic.
//!
//! All math is `rust_decimal`; nothing here touches the database. The
//! forward direction solves for the price that hits a target margin, the
//! inverse reports the margin realized at a given price. Both share the
//! same cost model: supplier cost in JPY converted at the current USD/JPY
//! rate, plus outbound shipping, minus the marketplace final-value fee.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;

/// Errors from the pricing formulas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("supplier cost must be positive (got {0})")]
    NonPositiveCost(Decimal),
    #[error("exchange rate must be positive (got {0})")]
    NonPositiveRate(Decimal),
    #[error("selling price must be positive (got {0})")]
    NonPositivePrice(Decimal),
    #[error("fee rate {fee_rate} plus target margin {margin_pct}% leave no room for the price")]
    MarginTooHigh {
        fee_rate: Decimal,
        margin_pct: Decimal,
    },
}

/// Everything the formula needs to price one listing.
#[derive(Debug, Clone, Copy)]
pub struct PriceInputs {
    /// Supplier cost in whole yen.
    pub cost_jpy: Decimal,
    /// Outbound shipping cost in USD borne by the seller.
    pub shipping_usd: Decimal,
    /// Marketplace final-value fee as a fraction (0.1325 = 13.25%).
    pub fee_rate: Decimal,
    /// Margin percentage to solve for.
    pub target_margin_pct: Decimal,
    /// Yen per dollar.
    pub usd_jpy_rate: Decimal,
}

/// A priced listing with its derived components.
///
/// Components are rounded to cents and reconcile exactly:
/// `selling - cost - shipping - fee = profit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    /// Asking price in USD.
    pub selling_usd: Decimal,
    /// Supplier cost converted to USD.
    pub cost_usd: Decimal,
    /// Outbound shipping in USD.
    pub shipping_usd: Decimal,
    /// Marketplace fee at the asking price.
    pub fee_usd: Decimal,
    /// What is left after cost, shipping, and fees.
    pub profit_usd: Decimal,
    /// Profit as a percentage of the asking price.
    pub margin_pct: Decimal,
}

pub(crate) fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Solve for the selling price that realizes the target margin.
///
/// `selling = (cost/rate + shipping) / (1 - fee_rate - margin/100)`
///
/// The returned breakdown is computed at the cent-rounded price, so the
/// realized margin can differ from the target by rounding (under half a
/// cent of profit).
///
/// # Errors
///
/// Returns [`PricingError::MarginTooHigh`] when fee plus margin reaches
/// 100%, and `NonPositiveCost` / `NonPositiveRate` on degenerate inputs.
pub fn calculate_selling_price(inputs: &PriceInputs) -> Result<PriceBreakdown, PricingError> {
    if inputs.cost_jpy <= Decimal::ZERO {
        return Err(PricingError::NonPositiveCost(inputs.cost_jpy));
    }
    if inputs.usd_jpy_rate <= Decimal::ZERO {
        return Err(PricingError::NonPositiveRate(inputs.usd_jpy_rate));
    }

    let divisor =
        Decimal::ONE - inputs.fee_rate - inputs.target_margin_pct / Decimal::ONE_HUNDRED;
    if divisor <= Decimal::ZERO {
        return Err(PricingError::MarginTooHigh {
            fee_rate: inputs.fee_rate,
            margin_pct: inputs.target_margin_pct,
        });
    }

    let cost_usd = inputs.cost_jpy / inputs.usd_jpy_rate;
    let selling = round_cents((cost_usd + inputs.shipping_usd) / divisor);

    breakdown_at(selling, inputs)
}

/// The full breakdown at a given asking price.
///
/// Used to evaluate candidate prices that did not come out of the formula
/// (competitor-derived candidates, clamped floors).
///
/// # Errors
///
/// Returns `NonPositivePrice`, `NonPositiveCost`, or `NonPositiveRate` on
/// degenerate inputs.
pub fn breakdown_at(
    selling_usd: Decimal,
    inputs: &PriceInputs,
) -> Result<PriceBreakdown, PricingError> {
    if selling_usd <= Decimal::ZERO {
        return Err(PricingError::NonPositivePrice(selling_usd));
    }
    if inputs.cost_jpy <= Decimal::ZERO {
        return Err(PricingError::NonPositiveCost(inputs.cost_jpy));
    }
    if inputs.usd_jpy_rate <= Decimal::ZERO {
        return Err(PricingError::NonPositiveRate(inputs.usd_jpy_rate));
    }

    let selling = round_cents(selling_usd);
    let cost_usd = round_cents(inputs.cost_jpy / inputs.usd_jpy_rate);
    let fee_usd = round_cents(selling * inputs.fee_rate);
    let profit_usd = selling - cost_usd - inputs.shipping_usd - fee_usd;
    let margin_pct = round_cents(profit_usd / selling * Decimal::ONE_HUNDRED);

    Ok(PriceBreakdown {
        selling_usd: selling,
        cost_usd,
        shipping_usd: inputs.shipping_usd,
        fee_usd,
        profit_usd,
        margin_pct,
    })
}

/// The margin realized at a given selling price.
///
/// Inverse of [`calculate_selling_price`]: feeding its output back in
/// returns the target margin within cent-rounding tolerance.
///
/// # Errors
///
/// Returns `NonPositivePrice`, `NonPositiveCost`, or `NonPositiveRate` on
/// degenerate inputs.
pub fn calculate_margin(
    selling_usd: Decimal,
    cost_jpy: Decimal,
    usd_jpy_rate: Decimal,
    shipping_usd: Decimal,
    fee_rate: Decimal,
) -> Result<Decimal, PricingError> {
    let breakdown = breakdown_at(
        selling_usd,
        &PriceInputs {
            cost_jpy,
            shipping_usd,
            fee_rate,
            target_margin_pct: Decimal::ZERO,
            usd_jpy_rate,
        },
    )?;
    Ok(breakdown.margin_pct)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn inputs() -> PriceInputs {
        PriceInputs {
            cost_jpy: dec("3000"),
            shipping_usd: dec("5"),
            fee_rate: dec("0.1325"),
            target_margin_pct: dec("15"),
            usd_jpy_rate: dec("150"),
        }
    }

    #[test]
    fn solves_for_target_margin() {
        // cost 3000 JPY at 150 = $20; (20 + 5) / (1 - 0.1325 - 0.15)
        let breakdown = calculate_selling_price(&inputs()).unwrap();
        assert_eq!(breakdown.selling_usd, dec("34.84"));
        assert_eq!(breakdown.cost_usd, dec("20"));
        assert_eq!(breakdown.fee_usd, dec("4.62"));
        assert_eq!(breakdown.profit_usd, dec("5.22"));
    }

    #[test]
    fn components_reconcile() {
        let b = calculate_selling_price(&inputs()).unwrap();
        assert_eq!(
            b.selling_usd,
            b.cost_usd + b.shipping_usd + b.fee_usd + b.profit_usd
        );
    }

    #[test]
    fn margin_round_trips_within_cent_rounding() {
        for target in ["10", "15", "22.5", "40"] {
            let mut i = inputs();
            i.target_margin_pct = dec(target);
            let b = calculate_selling_price(&i).unwrap();
            let realized = calculate_margin(
                b.selling_usd,
                i.cost_jpy,
                i.usd_jpy_rate,
                i.shipping_usd,
                i.fee_rate,
            )
            .unwrap();
            let drift = (realized - dec(target)).abs();
            assert!(drift < dec("0.05"), "target {target} realized {realized}");
        }
    }

    #[test]
    fn margin_at_a_known_price() {
        // $40 sale: cost $20, shipping $5, fee $4 leaves $11 profit
        let margin =
            calculate_margin(dec("40"), dec("3000"), dec("150"), dec("5"), dec("0.10")).unwrap();
        assert_eq!(margin, dec("27.5"));
    }

    #[test]
    fn rejects_margin_that_consumes_the_price() {
        let mut i = inputs();
        i.fee_rate = dec("0.15");
        i.target_margin_pct = dec("85");
        assert!(matches!(
            calculate_selling_price(&i),
            Err(PricingError::MarginTooHigh { .. })
        ));

        i.target_margin_pct = dec("90");
        assert!(matches!(
            calculate_selling_price(&i),
            Err(PricingError::MarginTooHigh { .. })
        ));
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let mut i = inputs();
        i.cost_jpy = Decimal::ZERO;
        assert!(matches!(
            calculate_selling_price(&i),
            Err(PricingError::NonPositiveCost(_))
        ));

        let mut i = inputs();
        i.usd_jpy_rate = Decimal::ZERO;
        assert!(matches!(
            calculate_selling_price(&i),
            Err(PricingError::NonPositiveRate(_))
        ));

        assert!(matches!(
            calculate_margin(dec("0"), dec("3000"), dec("150"), dec("5"), dec("0.10")),
            Err(PricingError::NonPositivePrice(_))
        ));
    }
}
