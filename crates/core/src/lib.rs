//! Rakuda Core - Shared domain types.
//!
//! This crate provides common types used across all Rakuda components:
//! - `api` - Back-office HTTP service and background workers
//! - `cli` - Command-line tools for migrations, seeding, and sessions
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, marketplaces, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
