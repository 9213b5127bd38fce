//! Core types: Price, Quantity, Ticker

use std::fmt;

/// Money in smallest units (cents).
///
/// `Price(10050)` represents $100.50. Used for quotes, idle cash, and
/// notional values alike. Fixed-point keeps the portfolio-value invariant
/// exact across a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Convert a dollar amount to cents, rounding to the nearest cent.
    pub fn from_dollars(dollars: f64) -> Price {
        Price((dollars * 100.0).round() as i64)
    }

    /// Dollar amount as a float (display and reporting only).
    #[inline]
    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Value of `shares` at this price, in cents.
    #[inline]
    pub fn value_of(self, shares: Quantity) -> i64 {
        self.0 * shares as i64
    }

    /// Like [`Price::value_of`], but `None` when the product overflows.
    #[inline]
    pub fn checked_value_of(self, shares: Quantity) -> Option<i64> {
        i64::try_from(shares).ok().and_then(|q| self.0.checked_mul(q))
    }

    /// Whole shares affordable with `cash_cents` at this price.
    ///
    /// Returns 0 for non-positive prices or cash.
    #[inline]
    pub fn affordable(self, cash_cents: i64) -> Quantity {
        if self.0 <= 0 || cash_cents <= 0 {
            return 0;
        }
        (cash_cents / self.0) as Quantity
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display as dollars.cents
        let dollars = self.0 / 100;
        let cents = (self.0 % 100).abs();
        if self.0 < 0 {
            write!(f, "-${}.{:02}", dollars.abs(), cents)
        } else {
            write!(f, "${}.{:02}", dollars, cents)
        }
    }
}

/// Whole shares. Fractional shares are never traded.
pub type Quantity = u64;

/// Instrument identifier (e.g. `VTI`, `BND`).
///
/// Ordered lexicographically; that order is the final tie-break everywhere a
/// deterministic ranking is needed.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Ticker(String);

impl Ticker {
    pub fn new(s: &str) -> Self {
        Ticker(s.trim().to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Ticker::new(s)
    }
}
