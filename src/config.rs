//! Engine configuration.
//!
//! Passed explicitly into [`crate::rebalance`]; the engine reads no global
//! state.

use crate::error::{Error, Result};
use crate::types::Quantity;

/// Tunables for one rebalance pass.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalanceConfig {
    /// Minimum per-account drift, as a fraction of the ticker's target
    /// value, before an order is issued. Liquidations ignore it.
    pub threshold_fraction: f64,
    /// Allowed distance of the weight sum from 1.0 before a warning is logged.
    pub weight_tolerance: f64,
    /// Unplaced shares per ticker tolerated as rounding slack.
    pub slack_shares: Quantity,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            threshold_fraction: 0.05,
            weight_tolerance: 0.01,
            slack_shares: 1,
        }
    }
}

impl RebalanceConfig {
    /// Default config with a different no-trade threshold.
    pub fn with_threshold(threshold_fraction: f64) -> Self {
        Self {
            threshold_fraction,
            ..Self::default()
        }
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold_fraction) {
            return Err(Error::invalid(
                "config",
                format!(
                    "threshold_fraction must be in [0.0, 1.0], got {}",
                    self.threshold_fraction
                ),
            ));
        }
        if !self.weight_tolerance.is_finite() || self.weight_tolerance < 0.0 {
            return Err(Error::invalid(
                "config",
                format!(
                    "weight_tolerance must be >= 0, got {}",
                    self.weight_tolerance
                ),
            ));
        }
        Ok(())
    }
}
