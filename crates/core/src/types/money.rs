//! Exact money representation using decimal arithmetic.
//!
//! All money amounts in Rakuda are `rust_decimal::Decimal` - never floats.
//! A [`Money`] couples an amount with its [`Currency`] so that yen and
//! dollar values cannot be mixed by accident.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currencies handled by the back office.
///
/// JPY is a zero-decimal currency: supplier costs are whole yen. Everything
/// sold on the marketplaces is priced in a two-decimal currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    USD,
    JPY,
    EUR,
    GBP,
}

impl Currency {
    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::JPY => "JPY",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::JPY => "\u{a5}",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }

    /// Number of decimal places amounts in this currency carry.
    #[must_use]
    pub const fn decimals(self) -> u32 {
        match self {
            Self::JPY => 0,
            Self::USD | Self::EUR | Self::GBP => 2,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unknown currency code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown currency code: {0}")]
pub struct CurrencyParseError(pub String);

impl std::str::FromStr for Currency {
    type Err = CurrencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "JPY" => Ok(Self::JPY),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            other => Err(CurrencyParseError(other.to_string())),
        }
    }
}

/// An amount of money in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// The currency the amount is denominated in.
    pub currency: Currency,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Round to the currency's number of decimal places.
    ///
    /// Uses midpoint-away-from-zero, the convention customers expect on
    /// invoices (12.345 → 12.35, not banker's rounding).
    #[must_use]
    pub fn rounded(self) -> Self {
        Self {
            amount: self
                .amount
                .round_dp_with_strategy(self.currency.decimals(), RoundingStrategy::MidpointAwayFromZero),
            currency: self.currency,
        }
    }

    /// Format for display, e.g. `$19.99` or `¥2980`.
    #[must_use]
    pub fn display(self) -> String {
        let rounded = self.rounded();
        if self.currency.decimals() == 0 {
            format!("{}{}", self.currency.symbol(), rounded.amount)
        } else {
            format!("{}{:.2}", self.currency.symbol(), rounded.amount)
        }
    }

    /// Convert using a rate quoted for `pair`.
    ///
    /// The amount must be denominated in the pair's base currency; the result
    /// is in the quote currency. There is no implicit inversion: converting
    /// yen with a USD/JPY rate is an error, not a division.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] if the amount's currency is not the pair's
    /// base.
    pub fn convert(self, pair: CurrencyPair, rate: Decimal) -> Result<Self, ConversionError> {
        if self.currency != pair.base {
            return Err(ConversionError {
                pair,
                have: self.currency,
            });
        }
        Ok(Self {
            amount: self.amount * rate,
            currency: pair.quote,
        })
    }
}

/// Error returned when a conversion is attempted with a rate quoted for a
/// different pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate is quoted for {pair}, cannot convert an amount in {have}")]
pub struct ConversionError {
    /// The pair the rate was quoted for.
    pub pair: CurrencyPair,
    /// The currency the amount was actually in.
    pub have: Currency,
}

/// An ordered currency pair, e.g. `USD/JPY`.
///
/// A rate quoted for the pair means "this many `quote` units per one
/// `base` unit": USD/JPY at 147.32 means one dollar buys 147.32 yen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    /// Create a new pair.
    #[must_use]
    pub const fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }
}

impl std::fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Error returned when parsing a malformed currency pair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairParseError {
    #[error("expected BASE/QUOTE format, got: {0}")]
    Format(String),
    #[error(transparent)]
    Currency(#[from] CurrencyParseError),
}

impl std::str::FromStr for CurrencyPair {
    type Err = PairParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| PairParseError::Format(s.to_string()))?;
        Ok(Self {
            base: base.trim().parse()?,
            quote: quote.trim().parse()?,
        })
    }
}
