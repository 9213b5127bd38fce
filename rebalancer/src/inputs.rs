//! CSV input boundary.
//!
//! Reads the assets, accounts, and holdings files into typed core entities.
//! Row-level problems (unparseable numbers, negative shares, weights outside
//! [0, 1], unknown account types) are rejected here with the file and the
//! 1-based data row. Cross-file checks (unknown account in a holding,
//! duplicates) are left to [`PortfolioState::build`].

use std::path::Path;

use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use taxfolio::{Account, AccountKind, Asset, Holding, PortfolioState, Price};

use crate::config::InputsConfig;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct AssetRow {
    #[serde(rename = "Ticker")]
    ticker: String,
    #[serde(rename = "Vol")]
    vol: f64,
    #[serde(rename = "Cash_Weight")]
    cash_weight: f64,
    #[serde(rename = "Asset_Class", default)]
    asset_class: String,
    #[serde(rename = "Sub_Class", default)]
    sub_class: String,
}

#[derive(Debug, Deserialize)]
struct AccountRow {
    #[serde(rename = "Account")]
    account: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Idle_Cash")]
    idle_cash: f64,
}

#[derive(Debug, Deserialize)]
struct HoldingRow {
    #[serde(rename = "Ticker")]
    ticker: String,
    #[serde(rename = "Account")]
    account: String,
    #[serde(rename = "Shares")]
    shares: i64,
}

/// Deserialize every row of `path` through `f`. Errors carry the row number.
pub(crate) fn read_rows<R, T, F>(path: &Path, mut f: F) -> Result<Vec<T>>
where
    R: DeserializeOwned,
    F: FnMut(R) -> std::result::Result<T, String>,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::InputRead {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut out = Vec::new();
    for (i, record) in reader.deserialize::<R>().enumerate() {
        let row = i + 1;
        let record = record.map_err(|e| row_error(path, row, e.to_string()))?;
        out.push(f(record).map_err(|reason| row_error(path, row, reason))?);
    }
    debug!("{}: {} rows", path.display(), out.len());
    Ok(out)
}

fn row_error(path: &Path, row: usize, reason: String) -> Error {
    Error::InputRow {
        path: path.to_path_buf(),
        row,
        reason,
    }
}

/// Load the asset list (`Ticker,Vol,Cash_Weight,Asset_Class,Sub_Class`).
pub fn load_assets(path: &Path) -> Result<Vec<Asset>> {
    read_rows(path, |r: AssetRow| {
        if r.ticker.is_empty() {
            return Err("empty ticker".into());
        }
        if !r.vol.is_finite() || r.vol < 0.0 {
            return Err(format!("{}: volatility must be >= 0, got {}", r.ticker, r.vol));
        }
        if !(0.0..=1.0).contains(&r.cash_weight) {
            return Err(format!(
                "{}: cash weight must be in [0, 1], got {}",
                r.ticker, r.cash_weight
            ));
        }
        Ok(Asset::new(&r.ticker, r.vol, r.cash_weight).with_class(&r.asset_class, &r.sub_class))
    })
}

/// Load the account list (`Account,Type,Idle_Cash`); cash is in dollars.
pub fn load_accounts(path: &Path) -> Result<Vec<Account>> {
    read_rows(path, |r: AccountRow| {
        if r.account.is_empty() {
            return Err("empty account name".into());
        }
        let kind = AccountKind::parse(&r.kind).ok_or_else(|| {
            format!(
                "{}: unknown account type {:?} (expected Taxable or Tax-Advantaged)",
                r.account, r.kind
            )
        })?;
        if !r.idle_cash.is_finite() || r.idle_cash < 0.0 {
            return Err(format!(
                "{}: idle cash must be >= 0, got {}",
                r.account, r.idle_cash
            ));
        }
        Ok(Account::new(&r.account, kind, Price::from_dollars(r.idle_cash)))
    })
}

/// Load current holdings (`Ticker,Account,Shares`). A header-only file is
/// a fresh portfolio.
pub fn load_holdings(path: &Path) -> Result<Vec<Holding>> {
    read_rows(path, |r: HoldingRow| {
        if r.ticker.is_empty() {
            return Err(format!("{}: empty ticker", r.account));
        }
        if r.shares < 0 {
            return Err(format!(
                "{}@{}: negative share count {}",
                r.ticker, r.account, r.shares
            ));
        }
        Ok(Holding::new(&r.ticker, &r.account, r.shares))
    })
}

/// Load all three files and assemble a validated portfolio state.
pub fn load_state(inputs: &InputsConfig) -> Result<PortfolioState> {
    let assets = load_assets(&inputs.assets)?;
    let accounts = load_accounts(&inputs.accounts)?;
    let holdings = load_holdings(&inputs.holdings)?;
    Ok(PortfolioState::build(assets, accounts, holdings)?)
}
