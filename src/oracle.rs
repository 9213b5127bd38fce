//! Price oracle abstraction and the frozen per-run price snapshot.
//!
//! The engine asks the oracle once, in bulk, for every ticker it needs. The
//! answer is frozen into a [`PriceSnapshot`] and never refreshed during the
//! run, so every stage sees the same prices.
//!
//! ```
//! use taxfolio::oracle::{PriceOracle, PriceSnapshot, StaticQuotes};
//! use taxfolio::{Price, Ticker};
//!
//! let quotes = StaticQuotes::new()
//!     .with_quote("VTI", Price(100_00))
//!     .with_quote("BND", Price(80_00));
//!
//! let snapshot = PriceSnapshot::fetch(&quotes, &[Ticker::from("VTI")]).unwrap();
//! assert_eq!(snapshot.price(&Ticker::from("VTI")).unwrap(), Price(100_00));
//! ```

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::types::{Price, Ticker};

/// Source of current prices.
///
/// Implementations may return quotes for a subset of the requested tickers;
/// [`PriceSnapshot::fetch`] turns gaps into [`Error::MissingPrice`].
pub trait PriceOracle {
    /// Quote every ticker in `tickers` (cents per share).
    fn quotes(&self, tickers: &[Ticker]) -> Result<Vec<(Ticker, Price)>>;
}

impl<T: PriceOracle + ?Sized> PriceOracle for &T {
    fn quotes(&self, tickers: &[Ticker]) -> Result<Vec<(Ticker, Price)>> {
        (**self).quotes(tickers)
    }
}

/// Immutable ticker → price map for one run.
#[derive(Clone, Debug, Default)]
pub struct PriceSnapshot {
    prices: FxHashMap<Ticker, Price>,
}

impl PriceSnapshot {
    /// Fetch quotes for `tickers` in one call and validate them.
    ///
    /// Fails if the oracle fails, if any requested ticker is missing, or if
    /// any quote is not strictly positive. No partial snapshot is returned.
    pub fn fetch(oracle: &dyn PriceOracle, tickers: &[Ticker]) -> Result<Self> {
        if tickers.is_empty() {
            return Ok(Self::default());
        }

        let quoted = oracle.quotes(tickers)?;
        let mut prices = FxHashMap::default();
        for (ticker, price) in quoted {
            if price.0 <= 0 {
                return Err(Error::invalid(
                    format!("price {ticker}"),
                    format!("quote must be positive, got {price}"),
                ));
            }
            prices.insert(ticker, price);
        }

        let snapshot = Self { prices };
        for ticker in tickers {
            snapshot.price(ticker)?;
        }
        Ok(snapshot)
    }

    /// Build a snapshot directly from known prices (tests, replays).
    pub fn from_pairs(pairs: &[(Ticker, Price)]) -> Self {
        Self {
            prices: pairs.iter().cloned().collect(),
        }
    }

    /// Price of `ticker`, or [`Error::MissingPrice`].
    pub fn price(&self, ticker: &Ticker) -> Result<Price> {
        self.prices
            .get(ticker)
            .copied()
            .ok_or_else(|| Error::MissingPrice {
                ticker: ticker.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// All (ticker, price) pairs sorted by ticker.
    pub fn sorted_pairs(&self) -> Vec<(Ticker, Price)> {
        let mut pairs: Vec<(Ticker, Price)> =
            self.prices.iter().map(|(t, p)| (t.clone(), *p)).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

/// In-memory oracle with fixed quotes.
///
/// Use it in tests or when prices come from a file rather than a live feed.
#[derive(Clone, Debug, Default)]
pub struct StaticQuotes {
    quotes: FxHashMap<Ticker, Price>,
    failure: Option<String>,
}

impl StaticQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, ticker: &str, price: Price) -> Self {
        self.quotes.insert(Ticker::new(ticker), price);
        self
    }

    pub fn insert(&mut self, ticker: Ticker, price: Price) {
        self.quotes.insert(ticker, price);
    }

    /// Make every `quotes` call fail with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            quotes: FxHashMap::default(),
            failure: Some(reason.to_string()),
        }
    }
}

impl PriceOracle for StaticQuotes {
    fn quotes(&self, tickers: &[Ticker]) -> Result<Vec<(Ticker, Price)>> {
        if let Some(reason) = &self.failure {
            return Err(Error::Oracle(reason.clone()));
        }
        Ok(tickers
            .iter()
            .filter_map(|t| self.quotes.get(t).map(|p| (t.clone(), *p)))
            .collect())
    }
}
