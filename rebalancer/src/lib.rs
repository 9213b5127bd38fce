// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! taxfolio-rebalancer: CLI front end for the taxfolio engine.
//!
//! Reads target weights, accounts, holdings, and prices from CSV files,
//! computes a tax-aware rebalance plan, prints it, and appends an audit
//! trail. Orders are proposals only; nothing is sent to a broker.

pub mod audit;
pub mod config;
pub mod error;
pub mod inputs;
pub mod quotes;
pub mod runner;
