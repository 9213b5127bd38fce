//! Assets: the instruments a portfolio targets.

use crate::types::Ticker;

/// One instrument in the target configuration.
///
/// Immutable for a run. `cash_weight` is the fraction of total portfolio
/// value this asset should represent; `volatility` drives both account
/// placement and order sequencing.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Asset {
    pub ticker: Ticker,
    pub volatility: f64,
    pub cash_weight: f64,
    pub asset_class: String,
    pub sub_class: String,
}

impl Asset {
    pub fn new(ticker: &str, volatility: f64, cash_weight: f64) -> Self {
        Self {
            ticker: Ticker::new(ticker),
            volatility,
            cash_weight,
            asset_class: String::new(),
            sub_class: String::new(),
        }
    }

    /// Attach asset/sub class labels (informational only).
    pub fn with_class(mut self, asset_class: &str, sub_class: &str) -> Self {
        self.asset_class = asset_class.to_string();
        self.sub_class = sub_class.to_string();
        self
    }
}
