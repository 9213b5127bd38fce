// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! # taxfolio
//!
//! A deterministic, tax-aware rebalancing engine for portfolios spread over
//! several accounts.
//!
//! Given per-asset cash weights, account cash, current holdings, and a price
//! oracle, one pass produces a minimal, sequenced list of whole-share BUY and
//! SELL orders per account.
//!
//! ## Features
//!
//! - **Whole shares**: targets are `floor(value × weight / price)`
//! - **Tax-aware placement**: volatile assets fill tax-advantaged accounts first
//! - **Low churn**: correctly placed holdings are kept; small drifts are ignored
//! - **Cash-safe**: an account's buys never exceed its cash plus its own sells
//! - **Deterministic**: explicit total orders everywhere, one frozen price snapshot
//!
//! ## Quick Start
//!
//! ```
//! use taxfolio::oracle::StaticQuotes;
//! use taxfolio::{rebalance, Account, Action, Asset, Price, PortfolioState, RebalanceConfig};
//!
//! let state = PortfolioState::build(
//!     vec![Asset::new("VTI", 0.10, 0.6), Asset::new("BND", 0.03, 0.4)],
//!     vec![Account::taxable("Brokerage", Price(10_000_00))],
//!     vec![],
//! )
//! .unwrap();
//!
//! let quotes = StaticQuotes::new()
//!     .with_quote("VTI", Price(100_00))
//!     .with_quote("BND", Price(50_00));
//!
//! let plan = rebalance(&state, &quotes, &RebalanceConfig::default()).unwrap();
//!
//! assert_eq!(plan.orders.len(), 2);
//! assert!(plan.orders.iter().all(|o| o.action == Action::Buy));
//! assert_eq!(plan.orders[0].ticker.as_str(), "BND"); // lower volatility buys first
//! assert_eq!(plan.orders[0].shares, 80);
//! assert_eq!(plan.orders[1].shares, 60);
//! ```
//!
//! ## Money Representation
//!
//! Prices and cash are [`i64`] cents:
//!
//! ```
//! use taxfolio::Price;
//!
//! let price = Price(100_50);  // $100.50
//! assert_eq!(format!("{}", price), "$100.50");
//! ```
//!
//! ## Order Sequence
//!
//! | Group | Order within group |
//! |-------|--------------------|
//! | **SELL** | volatility high→low, Taxable before Tax-Advantaged, ticker |
//! | **BUY** | volatility low→high, Tax-Advantaged before Taxable, ticker |
//!
//! ## Post-Trade State
//!
//! Applying a plan and rebalancing again is a fixed point:
//!
//! ```
//! use taxfolio::oracle::StaticQuotes;
//! use taxfolio::{rebalance, Account, Asset, Holding, Price, PortfolioState, RebalanceConfig};
//!
//! let state = PortfolioState::build(
//!     vec![Asset::new("VTI", 0.10, 1.0)],
//!     vec![Account::taxable("Brokerage", Price(1_000_00))],
//!     vec![Holding::new("VXUS", "Brokerage", 30)],
//! )
//! .unwrap();
//! let quotes = StaticQuotes::new()
//!     .with_quote("VTI", Price(100_00))
//!     .with_quote("VXUS", Price(50_00));
//! let config = RebalanceConfig::default();
//!
//! let plan = rebalance(&state, &quotes, &config).unwrap();
//! let after = plan.post_trade_state(&state).unwrap();
//! assert!(rebalance(&after, &quotes, &config).unwrap().orders.is_empty());
//! ```

mod account;
mod action;
mod asset;
mod config;
pub mod drift;
mod engine;
mod error;
pub mod oracle;
pub mod orders;
pub mod placement;
pub mod sequence;
mod state;
pub mod target;
mod types;

// Re-export public API
pub use account::{Account, AccountKind, Holding};
pub use action::Action;
pub use asset::Asset;
pub use config::RebalanceConfig;
pub use drift::{DriftEntry, DriftReport, drift_report};
pub use engine::{PlanSummary, RebalancePlan, rebalance, rebalance_with_prices};
pub use error::{Error, Result, UnallocatableError};
pub use oracle::{PriceOracle, PriceSnapshot};
pub use orders::Order;
pub use placement::PlacedTarget;
pub use state::PortfolioState;
pub use target::TargetPosition;
pub use types::{Price, Quantity, Ticker};
