//! Live tests for the read-through cache.
//!
//! These need a running Redis: the properties under test are the wire
//! behaviors — concurrent misses for one key coalescing onto a single
//! fetch, and namespace invalidation deleting only its own prefix.
//! Every test keys its entries with a fresh UUID so runs never collide.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rakuda_api::cache::{CacheNamespace, CacheService};
use uuid::Uuid;

async fn connect() -> CacheService {
    let url = std::env::var("REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    CacheService::connect(&url)
        .await
        .expect("Failed to connect to Redis")
}

/// Store a known value under the namespace via the read-through path.
async fn seed(service: &CacheService, namespace: CacheNamespace, params: &str, value: u64) {
    let stored = service
        .get_or_fetch(namespace, Some(params), || async { Ok::<u64, String>(value) })
        .await
        .expect("Failed to seed cache entry");
    assert_eq!(stored, value);
}

#[tokio::test]
#[ignore = "Requires a running Redis"]
async fn test_concurrent_misses_run_the_fetch_once() {
    let service = connect().await;
    let params = format!("USD/JPY:{}", Uuid::new_v4());
    let fetches = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let params = params.clone();
        let fetches = Arc::clone(&fetches);
        handles.push(tokio::spawn(async move {
            service
                .get_or_fetch(CacheNamespace::ExchangeRates, Some(params.as_str()), || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    // Hold the miss open so the others pile up behind it
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<u64, String>(14718)
                })
                .await
        }));
    }

    for handle in handles {
        let value = handle.await.expect("Task panicked").expect("Fetch failed");
        assert_eq!(value, 14718);
    }
    assert_eq!(
        fetches.load(Ordering::SeqCst),
        1,
        "only one caller may run the fetch; the rest re-read the stored entry"
    );

    service
        .invalidate(CacheNamespace::ExchangeRates, Some(&params))
        .await
        .expect("Failed to clean up");
}

#[tokio::test]
#[ignore = "Requires a running Redis"]
async fn test_namespace_invalidation_spares_other_namespaces() {
    let service = connect().await;
    let run = Uuid::new_v4();
    let rate_a = format!("USD/JPY:{run}");
    let rate_b = format!("EUR/JPY:{run}");
    let stats_key = run.to_string();

    seed(&service, CacheNamespace::ExchangeRates, &rate_a, 147).await;
    seed(&service, CacheNamespace::ExchangeRates, &rate_b, 160).await;
    seed(&service, CacheNamespace::DashboardStats, &stats_key, 5).await;

    let deleted = service
        .invalidate_namespace(CacheNamespace::ExchangeRates)
        .await
        .expect("Failed to invalidate namespace");
    assert!(deleted >= 2, "both rate entries must go, deleted {deleted}");

    // The sibling namespace still serves from the cache
    let refetched = AtomicUsize::new(0);
    let value = service
        .get_or_fetch(CacheNamespace::DashboardStats, Some(&stats_key), || async {
            refetched.fetch_add(1, Ordering::SeqCst);
            Ok::<u64, String>(99)
        })
        .await
        .expect("Failed to read dashboard entry");
    assert_eq!(value, 5, "dashboard entry must survive the rates flush");
    assert_eq!(refetched.load(Ordering::SeqCst), 0);

    // The invalidated namespace goes back to its source
    let refetched = AtomicUsize::new(0);
    let value = service
        .get_or_fetch(CacheNamespace::ExchangeRates, Some(&rate_a), || async {
            refetched.fetch_add(1, Ordering::SeqCst);
            Ok::<u64, String>(148)
        })
        .await
        .expect("Failed to re-read rate entry");
    assert_eq!(value, 148);
    assert_eq!(refetched.load(Ordering::SeqCst), 1);

    service
        .invalidate(CacheNamespace::ExchangeRates, Some(&rate_a))
        .await
        .expect("Failed to clean up");
    service
        .invalidate(CacheNamespace::DashboardStats, Some(&stats_key))
        .await
        .expect("Failed to clean up");
}
