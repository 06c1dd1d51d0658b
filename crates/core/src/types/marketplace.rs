//! Sales channels the back office manages listings on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A marketplace a listing is published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Marketplace {
    Ebay,
    Joom,
}

impl Marketplace {
    /// Stable lowercase identifier, matching the database enum labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ebay => "ebay",
            Self::Joom => "joom",
        }
    }

    /// Default final-value fee rate charged by the marketplace, as a
    /// fraction of the sale price. Listings can override this per item.
    #[must_use]
    pub fn default_fee_rate(self) -> Decimal {
        match self {
            // 13.25% standard final value fee
            Self::Ebay => Decimal::new(1325, 4),
            // 15% commission tier
            Self::Joom => Decimal::new(1500, 4),
        }
    }
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown marketplace name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown marketplace: {0}")]
pub struct MarketplaceParseError(pub String);

impl std::str::FromStr for Marketplace {
    type Err = MarketplaceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ebay" => Ok(Self::Ebay),
            "joom" => Ok(Self::Joom),
            other => Err(MarketplaceParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for mp in [Marketplace::Ebay, Marketplace::Joom] {
            assert_eq!(mp.as_str().parse::<Marketplace>().unwrap(), mp);
        }
    }

    #[test]
    fn fee_rates_are_fractions() {
        assert!(Marketplace::Ebay.default_fee_rate() < Decimal::ONE);
        assert!(Marketplace::Joom.default_fee_rate() > Decimal::ZERO);
    }
}
