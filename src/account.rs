//! Accounts and holdings.

use std::fmt;

use crate::types::{Price, Quantity, Ticker};

/// Tax treatment of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccountKind {
    Taxable,
    TaxAdvantaged,
}

impl AccountKind {
    /// Parse the labels used in account files.
    ///
    /// Accepts `Taxable` and `Tax-Advantaged`, case-insensitive, with or
    /// without the hyphen.
    pub fn parse(s: &str) -> Option<Self> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "taxable" => Some(AccountKind::Taxable),
            "taxadvantaged" => Some(AccountKind::TaxAdvantaged),
            _ => None,
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Taxable => f.pad("Taxable"),
            AccountKind::TaxAdvantaged => f.pad("Tax-Advantaged"),
        }
    }
}

/// A brokerage account with uninvested cash.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Account {
    pub name: String,
    pub kind: AccountKind,
    /// Uninvested cash (cents)
    pub idle_cash: Price,
}

impl Account {
    pub fn new(name: &str, kind: AccountKind, idle_cash: Price) -> Self {
        Self {
            name: name.trim().to_string(),
            kind,
            idle_cash,
        }
    }

    pub fn taxable(name: &str, idle_cash: Price) -> Self {
        Self::new(name, AccountKind::Taxable, idle_cash)
    }

    pub fn tax_advantaged(name: &str, idle_cash: Price) -> Self {
        Self::new(name, AccountKind::TaxAdvantaged, idle_cash)
    }
}

/// Shares of one ticker held in one account.
///
/// Signed so that negative counts from an input file reach validation
/// instead of wrapping.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Holding {
    pub ticker: Ticker,
    pub account: String,
    pub shares: i64,
}

impl Holding {
    pub fn new(ticker: &str, account: &str, shares: i64) -> Self {
        Self {
            ticker: Ticker::new(ticker),
            account: account.trim().to_string(),
            shares,
        }
    }

    /// Share count as a validated quantity (negative counts map to zero).
    #[inline]
    pub fn quantity(&self) -> Quantity {
        self.shares.max(0) as Quantity
    }
}
