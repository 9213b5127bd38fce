//! Drift report: actual portfolio weights vs cash-weight targets.

use std::fmt;

use crate::error::Result;
use crate::oracle::PriceSnapshot;
use crate::state::PortfolioState;
use crate::target;
use crate::types::{Quantity, Ticker};

/// Per-ticker drift plus overall tracking error.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriftReport {
    pub entries: Vec<DriftEntry>,
    /// Root-mean-square weight difference, in percent
    pub tracking_error_pct: f64,
}

/// One ticker's drift entry.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriftEntry {
    pub ticker: Ticker,
    pub target_weight: f64,
    pub actual_weight: f64,
    pub diff_weight: f64,
    pub target_shares: Quantity,
    pub actual_shares: Quantity,
    pub diff_shares: i64,
}

impl DriftReport {
    /// Largest absolute weight drift, if any ticker is tracked.
    pub fn worst(&self) -> Option<&DriftEntry> {
        self.entries
            .iter()
            .max_by(|a, b| a.diff_weight.abs().total_cmp(&b.diff_weight.abs()))
    }
}

/// Compare current holdings (summed over accounts) against targets.
pub fn drift_report(state: &PortfolioState, prices: &PriceSnapshot) -> Result<DriftReport> {
    let total_value = state.total_value(prices)?;
    let mut targets = target::allocate(state, prices, total_value)?;
    targets.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    let held = state.shares_by_ticker();

    let mut entries = Vec::with_capacity(targets.len());
    let mut sum_sq_diff = 0.0_f64;

    for t in &targets {
        let actual_shares = held.get(&t.ticker).copied().unwrap_or(0);
        let actual_weight = if total_value > 0 {
            t.price.value_of(actual_shares) as f64 / total_value as f64
        } else {
            0.0
        };
        let diff_weight = actual_weight - t.cash_weight;
        sum_sq_diff += diff_weight * diff_weight;

        entries.push(DriftEntry {
            ticker: t.ticker.clone(),
            target_weight: t.cash_weight,
            actual_weight,
            diff_weight,
            target_shares: t.target_shares,
            actual_shares,
            diff_shares: actual_shares as i64 - t.target_shares as i64,
        });
    }

    let tracking_error_pct = (sum_sq_diff / entries.len().max(1) as f64).sqrt() * 100.0;

    Ok(DriftReport {
        entries,
        tracking_error_pct,
    })
}

impl fmt::Display for DriftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DRIFT:")?;
        writeln!(
            f,
            "  {:8} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "Ticker", "Target%", "Actual%", "Diff%", "TargetQty", "ActualQty"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "  {:8} {:>9.2}% {:>9.2}% {:>+9.2}% {:>10} {:>10}",
                e.ticker,
                e.target_weight * 100.0,
                e.actual_weight * 100.0,
                e.diff_weight * 100.0,
                e.target_shares,
                e.actual_shares,
            )?;
        }
        writeln!(f, "\n  Tracking error: {:.3}%", self.tracking_error_pct)?;
        Ok(())
    }
}
