//! Shared read-through cache (Redis).
//!
//! Namespaces and TTLs are fixed at compile time in [`namespace`]; the
//! runtime service lives in [`service`]. Reads fail open, invalidation
//! reports its errors.

pub mod namespace;
pub mod service;

pub use namespace::{CacheNamespace, ROOT_PREFIX};
pub use service::{CacheService, CacheStats};
