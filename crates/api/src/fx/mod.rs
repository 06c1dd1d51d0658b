//! Currency conversion against an external rate provider.

pub mod client;

pub use client::{RateClient, RatesError};
