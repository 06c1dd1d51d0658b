//! Read-through cache over a shared Redis.
//!
//! Reads are fail-open: any Redis failure is logged, counted, and treated
//! as a miss, so a dead cache degrades to direct fetches instead of
//! taking reads down with it. Invalidation returns errors to the caller;
//! a delete that silently failed would leave stale data behind.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::namespace::{CacheNamespace, ROOT_PREFIX};

/// Keys deleted per `DEL` while walking a `SCAN` cursor.
const DELETE_BATCH: usize = 100;

/// Hint for how many keys each `SCAN` step should examine.
const SCAN_COUNT: usize = 100;

/// Hit/miss/error counters and the current entry count.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    /// Reads served from the cache.
    pub hits: u64,
    /// Reads that ran the fetch closure.
    pub misses: u64,
    /// Redis or decode failures absorbed by the fail-open policy.
    pub errors: u64,
    /// Live keys under the cache prefix; `None` when Redis is unreachable.
    pub entries: Option<u64>,
}

/// Cloneable handle to the shared cache.
#[derive(Clone)]
pub struct CacheService {
    inner: Arc<CacheServiceInner>,
}

struct CacheServiceInner {
    conn: ConnectionManager,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    // Per-key gates coalescing concurrent misses within this process.
    inflight: FlightTable,
}

/// Per-key fetch gates.
///
/// Each joined key holds a slot whose drop unregisters it, so a caller
/// cancelled mid-fetch (client disconnect) cannot strand an entry for a
/// key nobody is requesting anymore.
#[derive(Default)]
struct FlightTable {
    gates: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FlightTable {
    fn join(&self, key: &str) -> FlightSlot<'_> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        let gate = Arc::clone(
            gates
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        FlightSlot {
            table: self,
            key: key.to_string(),
            gate,
        }
    }
}

struct FlightSlot<'a> {
    table: &'a FlightTable,
    key: String,
    gate: Arc<Mutex<()>>,
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        let mut gates = self
            .table
            .gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // A later caller may have registered a fresh gate under the same
        // key; only remove the one this slot joined.
        if gates
            .get(&self.key)
            .is_some_and(|gate| Arc::ptr_eq(gate, &self.gate))
        {
            gates.remove(&self.key);
        }
    }
}

impl CacheService {
    /// Connect to Redis and return a handle.
    ///
    /// The connection manager reconnects on its own; a Redis that is down
    /// at startup fails here rather than on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the initial connection
    /// fails.
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            inner: Arc::new(CacheServiceInner {
                conn,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                errors: AtomicU64::new(0),
                inflight: FlightTable::default(),
            }),
        })
    }

    /// Read through the cache: return the stored entry if present,
    /// otherwise run `fetch`, store its result under the namespace TTL,
    /// and return it.
    ///
    /// Concurrent misses for the same key coalesce: one caller runs
    /// `fetch`, the rest wait and re-read the freshly stored entry.
    ///
    /// # Errors
    ///
    /// Only `fetch`'s own error reaches the caller; Redis failures are
    /// absorbed as misses.
    #[instrument(skip(self, fetch), fields(namespace = %namespace, params = ?params))]
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        namespace: CacheNamespace,
        params: Option<&str>,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = namespace.key(params);

        if let Some(value) = self.read(&key).await {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let slot = self.inner.inflight.join(&key);
        let _leader = slot.gate.lock().await;

        // A leader that finished while we queued has stored the entry.
        if let Some(value) = self.read(&key).await {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        debug!(%key, "cache miss, fetching");
        let result = fetch().await;

        if let Ok(value) = &result {
            self.write(&key, value, namespace.ttl()).await;
        }

        result
    }

    /// Delete one exact key.
    ///
    /// # Errors
    ///
    /// Returns an error if the `DEL` fails; the entry may still be live.
    pub async fn invalidate(
        &self,
        namespace: CacheNamespace,
        params: Option<&str>,
    ) -> Result<u64, redis::RedisError> {
        let key = namespace.key(params);
        let mut conn = self.inner.conn.clone();
        let deleted: u64 = conn.del(&key).await?;
        debug!(%key, deleted, "cache invalidated");
        Ok(deleted)
    }

    /// Delete every key in a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan or a delete fails partway; some keys
    /// may already be gone.
    pub async fn invalidate_namespace(
        &self,
        namespace: CacheNamespace,
    ) -> Result<u64, redis::RedisError> {
        self.delete_matching(&format!("{}*", namespace.prefix()))
            .await
    }

    /// Delete every key under `rakuda:cache:<prefix>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan or a delete fails partway.
    pub async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, redis::RedisError> {
        self.delete_matching(&format!("{ROOT_PREFIX}:{prefix}*"))
            .await
    }

    /// Delete every cache entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan or a delete fails partway.
    pub async fn flush_all(&self) -> Result<u64, redis::RedisError> {
        self.delete_matching(&format!("{ROOT_PREFIX}:*")).await
    }

    /// Counters plus a best-effort key count.
    pub async fn stats(&self) -> CacheStats {
        let entries = match self.count_matching(&format!("{ROOT_PREFIX}:*")).await {
            Ok(n) => Some(n),
            Err(error) => {
                warn!(%error, "cache entry count unavailable");
                None
            }
        };

        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            errors: self.inner.errors.load(Ordering::Relaxed),
            entries,
        }
    }

    /// Round-trip probe for the readiness endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if Redis does not answer `PING`.
    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.inner.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.inner.conn.clone();
        let raw: Option<String> = match conn.get(key).await {
            Ok(raw) => raw,
            Err(error) => {
                self.inner.errors.fetch_add(1, Ordering::Relaxed);
                warn!(%key, %error, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw?) {
            Ok(value) => Some(value),
            Err(error) => {
                self.inner.errors.fetch_add(1, Ordering::Relaxed);
                warn!(%key, %error, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(error) => {
                self.inner.errors.fetch_add(1, Ordering::Relaxed);
                warn!(%key, %error, "cache entry not serializable, skipping store");
                return;
            }
        };

        let mut conn = self.inner.conn.clone();
        let stored: Result<(), _> = conn.set_ex(key, payload, ttl.as_secs()).await;
        if let Err(error) = stored {
            self.inner.errors.fetch_add(1, Ordering::Relaxed);
            warn!(%key, %error, "cache store failed, serving uncached");
        }
    }

    // SCAN-based so large namespaces never block Redis the way KEYS does.
    async fn delete_matching(&self, pattern: &str) -> Result<u64, redis::RedisError> {
        let mut conn = self.inner.conn.clone();
        let mut deleted = 0u64;
        let mut cursor = 0u64;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            for batch in keys.chunks(DELETE_BATCH) {
                let n: u64 = conn.del(batch).await?;
                deleted += n;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern, deleted, "cache keys deleted");
        Ok(deleted)
    }

    async fn count_matching(&self, pattern: &str) -> Result<u64, redis::RedisError> {
        let mut conn = self.inner.conn.clone();
        let mut count = 0u64;
        let mut cursor = 0u64;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            count += keys.len() as u64;
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(count)
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("hits", &self.inner.hits.load(Ordering::Relaxed))
            .field("misses", &self.inner.misses.load(Ordering::Relaxed))
            .field("errors", &self.inner.errors.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn live_keys(table: &FlightTable) -> usize {
        table.gates.lock().unwrap().len()
    }

    #[test]
    fn concurrent_joins_share_one_gate() {
        let table = FlightTable::default();
        let first = table.join("rakuda:cache:exchange_rates:USD/JPY");
        let second = table.join("rakuda:cache:exchange_rates:USD/JPY");

        assert!(Arc::ptr_eq(&first.gate, &second.gate));
        assert_eq!(live_keys(&table), 1);
    }

    #[test]
    fn distinct_keys_get_distinct_gates() {
        let table = FlightTable::default();
        let rates = table.join("rakuda:cache:exchange_rates:USD/JPY");
        let stats = table.join("rakuda:cache:dashboard_stats");

        assert!(!Arc::ptr_eq(&rates.gate, &stats.gate));
        assert_eq!(live_keys(&table), 2);
    }

    #[test]
    fn dropped_slot_unregisters_its_key() {
        let table = FlightTable::default();
        let slot = table.join("rakuda:cache:dashboard_stats");
        assert_eq!(live_keys(&table), 1);

        // A caller that goes away (cancelled handler) must not leave its
        // key behind.
        drop(slot);
        assert_eq!(live_keys(&table), 0);
    }

    #[test]
    fn stale_slot_leaves_a_reregistered_gate_alone() {
        let table = FlightTable::default();

        let old = table.join("rakuda:cache:pending_shipments");
        let old_gate = Arc::clone(&old.gate);
        drop(old);
        assert_eq!(live_keys(&table), 0);

        // The key is re-registered by a fresh caller before a stale slot
        // for the old gate drops.
        let fresh = table.join("rakuda:cache:pending_shipments");
        let stale = FlightSlot {
            table: &table,
            key: "rakuda:cache:pending_shipments".to_string(),
            gate: old_gate,
        };
        drop(stale);

        let gates = table.gates.lock().unwrap();
        let kept = gates.get("rakuda:cache:pending_shipments").unwrap();
        assert!(Arc::ptr_eq(kept, &fresh.gate));
    }
}
