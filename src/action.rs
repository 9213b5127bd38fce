//! Order action: Buy or Sell

use std::fmt;

/// Direction of a proposed rebalance order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// Action that moves a position by `delta` shares, if any.
    #[inline]
    pub fn for_delta(delta: i64) -> Option<Self> {
        match delta {
            d if d > 0 => Some(Action::Buy),
            d if d < 0 => Some(Action::Sell),
            _ => None,
        }
    }

    /// Signed share multiplier: +1 for buys, -1 for sells.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Action::Buy => 1,
            Action::Sell => -1,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => f.pad("BUY"),
            Action::Sell => f.pad("SELL"),
        }
    }
}
