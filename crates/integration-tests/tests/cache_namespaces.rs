//! Integration tests for the cache namespace and TTL table.
//!
//! The admin cache endpoints and every cached read agree on this table;
//! these tests pin the key shapes and lifetimes so a rename or TTL edit
//! is a deliberate act.

use std::collections::HashSet;
use std::time::Duration;

use rakuda_api::cache::{CacheNamespace, ROOT_PREFIX};

// =============================================================================
// Key Shape Tests
// =============================================================================

#[test]
fn test_every_key_lives_under_the_root_prefix() {
    assert_eq!(ROOT_PREFIX, "rakuda:cache");
    for namespace in CacheNamespace::ALL {
        assert!(namespace.prefix().starts_with("rakuda:cache:"));
        assert!(namespace.key(None).starts_with("rakuda:cache:"));
    }
}

#[test]
fn test_unparameterized_key_is_the_prefix() {
    for namespace in CacheNamespace::ALL {
        assert_eq!(namespace.key(None), namespace.prefix());
    }
}

#[test]
fn test_parameterized_key_appends_suffix() {
    let key = CacheNamespace::ExchangeRates.key(Some("USD-JPY"));
    assert_eq!(key, "rakuda:cache:exchange_rates:USD-JPY");
}

#[test]
fn test_segments_are_distinct() {
    let segments: HashSet<&str> = CacheNamespace::ALL
        .iter()
        .map(|ns| ns.segment())
        .collect();
    assert_eq!(segments.len(), CacheNamespace::ALL.len());
}

#[test]
fn test_all_covers_every_namespace() {
    // A new namespace must be added to ALL or the admin config endpoint
    // and flush operation silently miss it.
    let all: HashSet<CacheNamespace> = CacheNamespace::ALL.into_iter().collect();
    for namespace in [
        CacheNamespace::ExchangeRates,
        CacheNamespace::DashboardStats,
        CacheNamespace::CompetitorPrices,
        CacheNamespace::PendingShipments,
        CacheNamespace::PricingRecommendations,
    ] {
        assert!(all.contains(&namespace));
    }
}

// =============================================================================
// TTL Table Tests
// =============================================================================

#[test]
fn test_ttl_table() {
    assert_eq!(
        CacheNamespace::ExchangeRates.ttl(),
        Duration::from_secs(3600)
    );
    assert_eq!(CacheNamespace::DashboardStats.ttl(), Duration::from_secs(300));
    assert_eq!(
        CacheNamespace::CompetitorPrices.ttl(),
        Duration::from_secs(1800)
    );
    assert_eq!(
        CacheNamespace::PendingShipments.ttl(),
        Duration::from_secs(60)
    );
    assert_eq!(
        CacheNamespace::PricingRecommendations.ttl(),
        Duration::from_secs(900)
    );
}

#[test]
fn test_shipment_backlog_has_the_shortest_ttl() {
    // Operators watch the backlog; it must go stale fastest
    let pending = CacheNamespace::PendingShipments.ttl();
    for namespace in CacheNamespace::ALL {
        assert!(pending <= namespace.ttl());
    }
}

// =============================================================================
// Wire Format Tests
// =============================================================================

#[test]
fn test_namespace_json_spelling() {
    let json = serde_json::to_string(&CacheNamespace::PricingRecommendations)
        .expect("serialize");
    assert_eq!(json, "\"pricing_recommendations\"");

    // The invalidate endpoint accepts the same spelling back
    let parsed: CacheNamespace =
        serde_json::from_str("\"dashboard_stats\"").expect("deserialize");
    assert_eq!(parsed, CacheNamespace::DashboardStats);
}

#[test]
fn test_display_matches_segment() {
    for namespace in CacheNamespace::ALL {
        assert_eq!(namespace.to_string(), namespace.segment());
    }
}
