//! Target allocator: portfolio-wide target value and whole-share count per
//! ticker.

use std::cmp::Ordering;

use crate::error::Result;
use crate::oracle::PriceSnapshot;
use crate::state::PortfolioState;
use crate::types::{Price, Quantity, Ticker};

/// Portfolio-wide target for one ticker.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetPosition {
    pub ticker: Ticker,
    pub volatility: f64,
    pub cash_weight: f64,
    pub price: Price,
    /// `total_value × cash_weight`, rounded to the cent
    pub target_value: i64,
    /// `total_value × cash_weight / price`, floored to whole shares
    pub target_shares: Quantity,
}

impl TargetPosition {
    /// Target is zero while the ticker is held somewhere: sell everything.
    #[inline]
    pub fn is_liquidation(&self) -> bool {
        self.target_shares == 0
    }
}

/// Placement rank: volatility descending, then ticker ascending.
pub fn rank_cmp(a: &TargetPosition, b: &TargetPosition) -> Ordering {
    b.volatility
        .total_cmp(&a.volatility)
        .then_with(|| a.ticker.cmp(&b.ticker))
}

/// Compute targets for every weighted asset and every held ticker.
///
/// Held tickers missing from the asset list get a zero target. Zero-weight
/// assets that are not held are skipped (they need no quote). The result is
/// sorted by [`rank_cmp`].
///
/// # Errors
///
/// [`crate::Error::MissingPrice`] when a required ticker has no quote.
pub fn allocate(
    state: &PortfolioState,
    prices: &PriceSnapshot,
    total_value: i64,
) -> Result<Vec<TargetPosition>> {
    let held = state.shares_by_ticker();
    let mut targets = Vec::new();

    for asset in state.assets() {
        let is_held = held.get(&asset.ticker).copied().unwrap_or(0) > 0;
        if asset.cash_weight <= 0.0 && !is_held {
            continue;
        }
        let price = prices.price(&asset.ticker)?;
        let exact = total_value as f64 * asset.cash_weight;
        targets.push(TargetPosition {
            ticker: asset.ticker.clone(),
            volatility: asset.volatility,
            cash_weight: asset.cash_weight,
            price,
            target_value: exact.round() as i64,
            target_shares: whole_shares(exact, price),
        });
    }

    let mut orphans: Vec<&Ticker> = held
        .keys()
        .filter(|t| state.asset(t).is_none())
        .collect();
    orphans.sort();
    for ticker in orphans {
        targets.push(TargetPosition {
            ticker: ticker.clone(),
            volatility: 0.0,
            cash_weight: 0.0,
            price: prices.price(ticker)?,
            target_value: 0,
            target_shares: 0,
        });
    }

    targets.sort_by(rank_cmp);
    Ok(targets)
}

/// Floor of `value_cents / price` from the unrounded dollar target.
///
/// Rounding the target to the cent first could add a share worth more than
/// the allotment.
fn whole_shares(value_cents: f64, price: Price) -> Quantity {
    if price.0 <= 0 || value_cents.is_nan() || value_cents <= 0.0 {
        return 0;
    }
    (value_cents / price.0 as f64).floor() as Quantity
}
