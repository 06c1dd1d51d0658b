//! Pricing engine: margin formula and strategy selection.
//!
//! [`engine`] holds the closed-form arithmetic, [`strategy`] the selector
//! that feeds it. The bulk recommendation generator that walks listings
//! lives in `services::repricer`; everything in this module is pure.

pub mod engine;
pub mod strategy;

pub use engine::{
    PriceBreakdown, PriceInputs, PricingError, breakdown_at, calculate_margin,
    calculate_selling_price,
};
pub use strategy::{MINIMUM_MARGIN_PCT, PricingStrategy, Quote, recommend_price};
