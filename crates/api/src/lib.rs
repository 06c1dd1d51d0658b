//! Rakuda back-office API library.
//!
//! This crate provides the API functionality as a library, allowing it
//! to be tested and reused (the migration CLI embeds it for its
//! migrator).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod ebay;
pub mod error;
pub mod fx;
pub mod middleware;
pub mod pricing;
pub mod routes;
pub mod services;
pub mod state;
