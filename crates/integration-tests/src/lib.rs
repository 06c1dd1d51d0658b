//! Integration tests for Rakuda.
//!
//! # Running Tests
//!
//! ```bash
//! # Logic-level tests (no external services)
//! cargo test -p rakuda-integration-tests
//!
//! # Live tests against a running API, database, and Redis
//! RAKUDA_API_BASE_URL=http://localhost:8080 \
//! RAKUDA_ADMIN_TOKEN=... \
//! RAKUDA_DATABASE_URL=postgres://localhost/rakuda \
//! REDIS_URL=redis://127.0.0.1:6379 \
//! cargo test -p rakuda-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `status_transitions` - Listing/order/shipment state machines
//! - `pricing_strategies` - Repricer strategy behavior end to end
//! - `cache_namespaces` - Cache key and TTL table
//! - `cache_readthrough` - Miss coalescing and prefix invalidation (ignored unless Redis is up)
//! - `listing_updates` - Concurrent listing updates (ignored unless Postgres is up)
//! - `message_rendering` - Template rendering against order context
//! - `security_sessions` - Token hashing and session lifetime rules
//! - `api_surface` - HTTP smoke tests (ignored unless a server is up)
