//! Core types for Rakuda.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod marketplace;
pub mod money;
pub mod status;

pub use id::*;
pub use marketplace::{Marketplace, MarketplaceParseError};
pub use money::{
    ConversionError, Currency, CurrencyPair, CurrencyParseError, Money, PairParseError,
};
pub use status::*;
