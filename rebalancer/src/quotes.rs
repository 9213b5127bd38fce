//! File-backed price oracle (`Ticker,Price` CSV, prices in dollars).

use std::path::Path;

use rustc_hash::FxHashSet;
use serde::Deserialize;
use taxfolio::oracle::StaticQuotes;
use taxfolio::{Price, Ticker};

use crate::error::Result;
use crate::inputs::read_rows;

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(rename = "Ticker")]
    ticker: String,
    #[serde(rename = "Price")]
    price: f64,
}

/// Load a price file into an in-memory oracle.
///
/// Every row must carry a positive price and each ticker may appear once.
/// Tickers the engine needs but the file lacks surface later as
/// [`taxfolio::Error::MissingPrice`].
pub fn load_quotes(path: &Path) -> Result<StaticQuotes> {
    let mut seen = FxHashSet::default();
    let rows = read_rows(path, |r: PriceRow| {
        if r.ticker.is_empty() {
            return Err("empty ticker".into());
        }
        if !r.price.is_finite() || r.price <= 0.0 {
            return Err(format!("{}: price must be > 0, got {}", r.ticker, r.price));
        }
        let ticker = Ticker::new(&r.ticker);
        if !seen.insert(ticker.clone()) {
            return Err(format!("{ticker}: duplicate price"));
        }
        Ok((ticker, Price::from_dollars(r.price)))
    })?;

    let mut quotes = StaticQuotes::new();
    for (ticker, price) in rows {
        quotes.insert(ticker, price);
    }
    Ok(quotes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;
    use taxfolio::PriceOracle;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn load_and_quote() {
        let f = csv_file("Ticker,Price\nVTI,230.15\nBND,72\n");
        let quotes = load_quotes(f.path()).unwrap();
        let got = quotes
            .quotes(&[Ticker::from("VTI"), Ticker::from("GLD")])
            .unwrap();
        assert_eq!(got, vec![(Ticker::from("VTI"), Price(230_15))]);
    }

    #[test]
    fn zero_price_rejected() {
        let f = csv_file("Ticker,Price\nVTI,0\n");
        assert!(matches!(
            load_quotes(f.path()).unwrap_err(),
            Error::InputRow { row: 1, .. }
        ));
    }

    #[test]
    fn duplicate_ticker_rejected() {
        let f = csv_file("Ticker,Price\nVTI,230\nVTI,231\n");
        let err = load_quotes(f.path()).unwrap_err();
        assert!(err.to_string().contains("row 2"));
        assert!(err.to_string().contains("duplicate"));
    }
}
