//! Error taxonomy for the rebalancing engine.

use crate::types::{Quantity, Ticker};

/// Fatal errors: any of these aborts the run before orders are produced.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// A ticker required by the weights or by a holding has no quote.
    #[error("missing price for {ticker}")]
    MissingPrice { ticker: Ticker },

    /// A malformed or out-of-range input record.
    #[error("invalid input ({context}): {reason}")]
    InvalidInput { context: String, reason: String },

    /// The price oracle itself failed.
    #[error("price oracle failed: {0}")]
    Oracle(String),
}

impl Error {
    pub(crate) fn invalid(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A ticker whose target could not be placed with the available cash.
///
/// Not fatal: collected into the plan alongside the orders that could be
/// computed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("cannot place {ticker}: {placed_shares} of {target_shares} target shares fit")]
pub struct UnallocatableError {
    pub ticker: Ticker,
    pub target_shares: Quantity,
    pub placed_shares: Quantity,
}

impl UnallocatableError {
    /// Shares that could not be placed.
    #[inline]
    pub fn shortfall(&self) -> Quantity {
        self.target_shares.saturating_sub(self.placed_shares)
    }
}
