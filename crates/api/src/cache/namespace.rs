//! The fixed namespace and TTL table for shared-cache entries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Every cache key lives under this prefix.
pub const ROOT_PREFIX: &str = "rakuda:cache";

/// One namespace per cacheable read, each with its own TTL.
///
/// TTLs follow how fast the underlying data moves: exchange rates are
/// refreshed hourly, the shipment backlog changes with every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheNamespace {
    ExchangeRates,
    DashboardStats,
    CompetitorPrices,
    PendingShipments,
    PricingRecommendations,
}

impl CacheNamespace {
    /// Every namespace, for the admin config endpoint and full flushes.
    pub const ALL: [Self; 5] = [
        Self::ExchangeRates,
        Self::DashboardStats,
        Self::CompetitorPrices,
        Self::PendingShipments,
        Self::PricingRecommendations,
    ];

    /// How long entries in this namespace live.
    #[must_use]
    pub const fn ttl(self) -> Duration {
        match self {
            Self::ExchangeRates => Duration::from_secs(3600),
            Self::DashboardStats => Duration::from_secs(300),
            Self::CompetitorPrices => Duration::from_secs(1800),
            Self::PendingShipments => Duration::from_secs(60),
            Self::PricingRecommendations => Duration::from_secs(900),
        }
    }

    /// Key segment for this namespace.
    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::ExchangeRates => "exchange_rates",
            Self::DashboardStats => "dashboard_stats",
            Self::CompetitorPrices => "competitor_prices",
            Self::PendingShipments => "pending_shipments",
            Self::PricingRecommendations => "pricing_recommendations",
        }
    }

    /// Full key prefix, `rakuda:cache:<segment>`.
    #[must_use]
    pub fn prefix(self) -> String {
        format!("{ROOT_PREFIX}:{}", self.segment())
    }

    /// Build the full key, appending `params` when the entry is
    /// parameterized (e.g. a currency pair).
    #[must_use]
    pub fn key(self, params: Option<&str>) -> String {
        match params {
            Some(params) => format!("{ROOT_PREFIX}:{}:{params}", self.segment()),
            None => self.prefix(),
        }
    }
}

impl std::fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.segment())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_rooted_under_the_shared_prefix() {
        for namespace in CacheNamespace::ALL {
            assert!(namespace.key(None).starts_with("rakuda:cache:"));
        }
    }

    #[test]
    fn params_extend_the_key() {
        assert_eq!(
            CacheNamespace::ExchangeRates.key(Some("USD/JPY")),
            "rakuda:cache:exchange_rates:USD/JPY"
        );
        assert_eq!(
            CacheNamespace::DashboardStats.key(None),
            "rakuda:cache:dashboard_stats"
        );
    }

    #[test]
    fn ttls_match_how_fast_the_data_moves() {
        assert_eq!(CacheNamespace::ExchangeRates.ttl(), Duration::from_secs(3600));
        assert_eq!(CacheNamespace::PendingShipments.ttl(), Duration::from_secs(60));
        // the backlog namespace must always beat the rates namespace
        assert!(CacheNamespace::PendingShipments.ttl() < CacheNamespace::ExchangeRates.ttl());
    }

    #[test]
    fn namespace_serializes_snake_case() {
        let json = serde_json::to_string(&CacheNamespace::PendingShipments).unwrap();
        assert_eq!(json, "\"pending_shipments\"");
        let back: CacheNamespace = serde_json::from_str("\"exchange_rates\"").unwrap();
        assert_eq!(back, CacheNamespace::ExchangeRates);
    }
}
