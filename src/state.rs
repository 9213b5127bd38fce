//! Portfolio state builder.
//!
//! Validates raw assets, accounts, and holdings into a [`PortfolioState`]
//! the engine can trust. Every rejection happens here, before any price is
//! fetched, and names the record that caused it.

use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::account::{Account, AccountKind, Holding};
use crate::asset::Asset;
use crate::error::{Error, Result};
use crate::oracle::PriceSnapshot;
use crate::types::{Quantity, Ticker};

/// Validated snapshot of the portfolio going into a rebalance.
///
/// Holdings with zero shares are dropped; every remaining holding references
/// a known account and is unique per (ticker, account).
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioState {
    assets: Vec<Asset>,
    accounts: Vec<Account>,
    holdings: Vec<Holding>,
}

impl PortfolioState {
    /// Validate and assemble a portfolio state.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for duplicate tickers or account names,
    /// out-of-range volatility/weight/cash, negative share counts, duplicate
    /// (ticker, account) holdings, or holdings in unknown accounts.
    pub fn build(assets: Vec<Asset>, accounts: Vec<Account>, holdings: Vec<Holding>) -> Result<Self> {
        let mut tickers = FxHashSet::default();
        for asset in &assets {
            let ctx = format!("asset {}", asset.ticker);
            if asset.ticker.is_empty() {
                return Err(Error::invalid("asset", "empty ticker"));
            }
            if !tickers.insert(asset.ticker.clone()) {
                return Err(Error::invalid(ctx, "duplicate ticker"));
            }
            if !asset.volatility.is_finite() || asset.volatility < 0.0 {
                return Err(Error::invalid(
                    ctx,
                    format!("volatility must be >= 0, got {}", asset.volatility),
                ));
            }
            if !(0.0..=1.0).contains(&asset.cash_weight) {
                return Err(Error::invalid(
                    ctx,
                    format!("cash weight must be in [0, 1], got {}", asset.cash_weight),
                ));
            }
        }

        let mut names = FxHashSet::default();
        for account in &accounts {
            let ctx = format!("account {}", account.name);
            if account.name.is_empty() {
                return Err(Error::invalid("account", "empty account name"));
            }
            if !names.insert(account.name.clone()) {
                return Err(Error::invalid(ctx, "duplicate account name"));
            }
            if account.idle_cash.0 < 0 {
                return Err(Error::invalid(
                    ctx,
                    format!("idle cash must be >= 0, got {}", account.idle_cash),
                ));
            }
        }

        let mut seen = FxHashSet::default();
        let mut kept = Vec::with_capacity(holdings.len());
        for holding in holdings {
            let ctx = format!("holding {}@{}", holding.ticker, holding.account);
            if holding.ticker.is_empty() {
                return Err(Error::invalid(ctx, "empty ticker"));
            }
            if !names.contains(&holding.account) {
                return Err(Error::invalid(ctx, "unknown account"));
            }
            if holding.shares < 0 {
                return Err(Error::invalid(
                    ctx,
                    format!("negative share count {}", holding.shares),
                ));
            }
            if !seen.insert((holding.ticker.clone(), holding.account.clone())) {
                return Err(Error::invalid(ctx, "duplicate holding"));
            }
            if holding.shares > 0 {
                kept.push(holding);
            }
        }

        Ok(Self {
            assets,
            accounts,
            holdings: kept,
        })
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    /// Look up an asset by ticker.
    pub fn asset(&self, ticker: &Ticker) -> Option<&Asset> {
        self.assets.iter().find(|a| &a.ticker == ticker)
    }

    /// Look up an account by name.
    pub fn account(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    /// Kind of the named account (unknown names cannot survive `build`).
    pub fn account_kind(&self, name: &str) -> Option<AccountKind> {
        self.account(name).map(|a| a.kind)
    }

    /// Shares of `ticker` held in `account` (zero when absent).
    pub fn shares(&self, ticker: &Ticker, account: &str) -> Quantity {
        self.holdings
            .iter()
            .find(|h| &h.ticker == ticker && h.account == account)
            .map(|h| h.quantity())
            .unwrap_or(0)
    }

    /// Volatility used for ranking; tickers outside the asset list count as 0.
    pub fn volatility(&self, ticker: &Ticker) -> f64 {
        self.asset(ticker).map(|a| a.volatility).unwrap_or(0.0)
    }

    /// Tickers that need a quote: positive weight or currently held.
    ///
    /// Sorted and deduplicated.
    pub fn required_tickers(&self) -> Vec<Ticker> {
        let mut tickers: Vec<Ticker> = self
            .assets
            .iter()
            .filter(|a| a.cash_weight > 0.0)
            .map(|a| a.ticker.clone())
            .chain(self.holdings.iter().map(|h| h.ticker.clone()))
            .collect();
        tickers.sort();
        tickers.dedup();
        tickers
    }

    /// Sum of cash weights across assets.
    pub fn weight_sum(&self) -> f64 {
        self.assets.iter().map(|a| a.cash_weight).sum()
    }

    /// Log a warning when weights drift from 1.0 by more than `tolerance`.
    ///
    /// Returns true when the weights are within tolerance.
    pub fn check_weight_sum(&self, tolerance: f64) -> bool {
        let sum = self.weight_sum();
        let ok = (sum - 1.0).abs() <= tolerance;
        if !ok && !self.assets.is_empty() {
            warn!("cash weights sum to {sum:.4}, outside 1.0 ± {tolerance}");
        }
        ok
    }

    /// Total portfolio value: idle cash plus market value of all holdings.
    ///
    /// # Errors
    ///
    /// [`Error::MissingPrice`] for an unquoted holding, [`Error::InvalidInput`]
    /// when the value does not fit in `i64` cents.
    pub fn total_value(&self, prices: &PriceSnapshot) -> Result<i64> {
        let mut total = 0i64;
        for account in &self.accounts {
            total = add_cents(total, account.idle_cash.0, &account.name)?;
        }
        for h in &self.holdings {
            total = add_cents(total, holding_value(h, prices)?, &h.account)?;
        }
        Ok(total)
    }

    /// Market value of everything in `account` (idle cash + holdings).
    pub fn account_value(&self, account: &Account, prices: &PriceSnapshot) -> Result<i64> {
        let mut value = account.idle_cash.0;
        for h in self.holdings.iter().filter(|h| h.account == account.name) {
            value = add_cents(value, holding_value(h, prices)?, &account.name)?;
        }
        Ok(value)
    }

    /// Per-ticker share totals summed across accounts.
    pub fn shares_by_ticker(&self) -> FxHashMap<Ticker, Quantity> {
        let mut totals: FxHashMap<Ticker, Quantity> = FxHashMap::default();
        for h in &self.holdings {
            *totals.entry(h.ticker.clone()).or_insert(0) += h.quantity();
        }
        totals
    }
}

fn holding_value(h: &Holding, prices: &PriceSnapshot) -> Result<i64> {
    prices
        .price(&h.ticker)?
        .checked_value_of(h.quantity())
        .ok_or_else(|| {
            Error::invalid(
                format!("holding {}@{}", h.ticker, h.account),
                format!("{} shares overflow the portfolio value", h.shares),
            )
        })
}

fn add_cents(acc: i64, cents: i64, context: &str) -> Result<i64> {
    acc.checked_add(cents)
        .ok_or_else(|| Error::invalid(context, "portfolio value overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Price;

    fn assets() -> Vec<Asset> {
        vec![Asset::new("VTI", 0.10, 0.6), Asset::new("BND", 0.03, 0.4)]
    }

    fn accounts() -> Vec<Account> {
        vec![
            Account::taxable("Brokerage", Price(5_000_00)),
            Account::tax_advantaged("IRA", Price(3_000_00)),
        ]
    }

    fn expect_invalid(result: Result<PortfolioState>, needle: &str) {
        match result {
            Err(Error::InvalidInput { context, reason }) => {
                let text = format!("{context}: {reason}");
                assert!(text.contains(needle), "{text} does not mention {needle}");
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn build_valid_state() {
        let holdings = vec![
            Holding::new("VTI", "Brokerage", 100),
            Holding::new("BND", "IRA", 0),
        ];
        let state = PortfolioState::build(assets(), accounts(), holdings).unwrap();
        assert_eq!(state.holdings().len(), 1, "zero-share rows are dropped");
        assert_eq!(state.shares(&Ticker::from("VTI"), "Brokerage"), 100);
        assert_eq!(state.shares(&Ticker::from("VTI"), "IRA"), 0);
        assert_eq!(state.account_kind("IRA"), Some(AccountKind::TaxAdvantaged));
    }

    #[test]
    fn reject_negative_shares() {
        let holdings = vec![Holding::new("VTI", "Brokerage", -5)];
        expect_invalid(
            PortfolioState::build(assets(), accounts(), holdings),
            "VTI@Brokerage",
        );
    }

    #[test]
    fn reject_unknown_account() {
        let holdings = vec![Holding::new("VTI", "401k", 5)];
        expect_invalid(
            PortfolioState::build(assets(), accounts(), holdings),
            "unknown account",
        );
    }

    #[test]
    fn reject_duplicate_holding() {
        let holdings = vec![
            Holding::new("VTI", "IRA", 5),
            Holding::new("VTI", "IRA", 7),
        ];
        expect_invalid(
            PortfolioState::build(assets(), accounts(), holdings),
            "duplicate holding",
        );
    }

    #[test]
    fn reject_weight_out_of_range() {
        let assets = vec![Asset::new("VTI", 0.1, 1.2)];
        expect_invalid(PortfolioState::build(assets, accounts(), vec![]), "asset VTI");
        let assets = vec![Asset::new("VTI", 0.1, -0.1)];
        expect_invalid(PortfolioState::build(assets, accounts(), vec![]), "cash weight");
    }

    #[test]
    fn reject_negative_volatility() {
        let assets = vec![Asset::new("ARKK", -0.4, 0.1)];
        expect_invalid(PortfolioState::build(assets, accounts(), vec![]), "volatility");
    }

    #[test]
    fn reject_duplicate_ticker_and_account() {
        let assets = vec![Asset::new("VTI", 0.1, 0.5), Asset::new("VTI", 0.1, 0.5)];
        expect_invalid(PortfolioState::build(assets, accounts(), vec![]), "duplicate ticker");

        let accounts = vec![
            Account::taxable("IRA", Price(1)),
            Account::tax_advantaged("IRA", Price(1)),
        ];
        expect_invalid(
            PortfolioState::build(vec![], accounts, vec![]),
            "duplicate account",
        );
    }

    #[test]
    fn reject_negative_cash() {
        let accounts = vec![Account::taxable("Brokerage", Price(-1))];
        expect_invalid(PortfolioState::build(vec![], accounts, vec![]), "idle cash");
    }

    #[test]
    fn required_tickers_union_of_weights_and_holdings() {
        let assets = vec![
            Asset::new("VTI", 0.1, 1.0),
            Asset::new("BND", 0.03, 0.0), // zero weight, not held: no quote needed
        ];
        let holdings = vec![Holding::new("VXUS", "IRA", 30)];
        let state = PortfolioState::build(assets, accounts(), holdings).unwrap();
        assert_eq!(
            state.required_tickers(),
            vec![Ticker::from("VTI"), Ticker::from("VXUS")]
        );
    }

    #[test]
    fn total_value_includes_cash_and_holdings() {
        let holdings = vec![
            Holding::new("VTI", "Brokerage", 10),
            Holding::new("BND", "IRA", 20),
        ];
        let state = PortfolioState::build(assets(), accounts(), holdings).unwrap();
        let prices = PriceSnapshot::from_pairs(&[
            (Ticker::from("VTI"), Price(100_00)),
            (Ticker::from("BND"), Price(50_00)),
        ]);
        // $8,000 cash + $1,000 VTI + $1,000 BND
        assert_eq!(state.total_value(&prices).unwrap(), 10_000_00);
        let ira = state.account("IRA").unwrap();
        assert_eq!(state.account_value(ira, &prices).unwrap(), 4_000_00);
    }

    #[test]
    fn total_value_missing_price() {
        let holdings = vec![Holding::new("VTI", "Brokerage", 10)];
        let state = PortfolioState::build(assets(), accounts(), holdings).unwrap();
        let err = state.total_value(&PriceSnapshot::default()).unwrap_err();
        assert!(matches!(err, Error::MissingPrice { .. }));
    }

    #[test]
    fn total_value_overflow_is_invalid_input() {
        let holdings = vec![Holding::new("VTI", "Brokerage", i64::MAX / 100)];
        let state = PortfolioState::build(assets(), accounts(), holdings).unwrap();
        let prices = PriceSnapshot::from_pairs(&[(Ticker::from("VTI"), Price(100_00))]);
        match state.total_value(&prices).unwrap_err() {
            Error::InvalidInput { context, .. } => assert_eq!(context, "holding VTI@Brokerage"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        let brokerage = state.account("Brokerage").unwrap();
        assert!(state.account_value(brokerage, &prices).is_err());
    }

    #[test]
    fn weight_sum_tolerance() {
        let state = PortfolioState::build(assets(), accounts(), vec![]).unwrap();
        assert!(state.check_weight_sum(0.01));

        let drifted = vec![Asset::new("VTI", 0.1, 0.6), Asset::new("BND", 0.03, 0.3)];
        let state = PortfolioState::build(drifted, accounts(), vec![]).unwrap();
        assert!(!state.check_weight_sum(0.01));
    }

    #[test]
    fn unknown_ticker_volatility_is_zero() {
        let holdings = vec![Holding::new("VXUS", "IRA", 30)];
        let state = PortfolioState::build(assets(), accounts(), holdings).unwrap();
        assert_eq!(state.volatility(&Ticker::from("VXUS")), 0.0);
        assert_eq!(state.volatility(&Ticker::from("VTI")), 0.10);
    }
}
