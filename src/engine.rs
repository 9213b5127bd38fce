//! Engine entry point: state + oracle + config → sequenced rebalance plan.

use std::fmt;

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::account::{Account, Holding};
use crate::action::Action;
use crate::config::RebalanceConfig;
use crate::error::{Result, UnallocatableError};
use crate::oracle::{PriceOracle, PriceSnapshot};
use crate::orders::{self, Order};
use crate::placement::{self, PlacedTarget};
use crate::state::PortfolioState;
use crate::target::{self, TargetPosition};
use crate::types::{Price, Ticker};

/// Everything one rebalance pass produced.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalancePlan {
    /// Idle cash plus holdings at snapshot prices (cents)
    pub total_value: Price,
    /// Portfolio-wide targets in placement rank order
    pub targets: Vec<TargetPosition>,
    /// Per-account breakdown of the targets
    pub placements: Vec<PlacedTarget>,
    /// Proposed orders in execution sequence
    pub orders: Vec<Order>,
    /// Tickers that could not be placed; the rest of the plan still stands
    pub unallocatable: Vec<UnallocatableError>,
}

/// Rebalance `state` toward its cash weights.
///
/// Prices are fetched once for every weighted or held ticker and frozen for
/// the whole pass.
///
/// # Errors
///
/// Fails before producing any order if the config is invalid, the oracle
/// fails, or a required ticker has no valid quote. Placement problems are not
/// errors: they are reported in [`RebalancePlan::unallocatable`].
pub fn rebalance(
    state: &PortfolioState,
    oracle: &dyn PriceOracle,
    config: &RebalanceConfig,
) -> Result<RebalancePlan> {
    config.validate()?;
    state.check_weight_sum(config.weight_tolerance);

    let required = state.required_tickers();
    let prices = PriceSnapshot::fetch(oracle, &required)?;
    debug!("froze {} prices", prices.len());

    rebalance_with_prices(state, &prices, config)
}

/// Rebalance against an already frozen price snapshot.
pub fn rebalance_with_prices(
    state: &PortfolioState,
    prices: &PriceSnapshot,
    config: &RebalanceConfig,
) -> Result<RebalancePlan> {
    let total_value = state.total_value(prices)?;
    let targets = target::allocate(state, prices, total_value)?;
    let placement = placement::place(state, &targets, config);
    let orders = orders::generate(state, &targets, &placement, config);

    info!(
        "total value {}: {} targets, {} orders, {} unallocatable",
        Price(total_value),
        targets.len(),
        orders.len(),
        placement.unallocatable.len()
    );

    Ok(RebalancePlan {
        total_value: Price(total_value),
        targets,
        placements: placement.placements,
        orders,
        unallocatable: placement.unallocatable,
    })
}

impl RebalancePlan {
    pub fn sells(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.action == Action::Sell)
    }

    pub fn buys(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.action == Action::Buy)
    }

    /// Target for `ticker`, if any.
    pub fn target(&self, ticker: &Ticker) -> Option<&TargetPosition> {
        self.targets.iter().find(|t| &t.ticker == ticker)
    }

    /// Portfolio state after every order fills at snapshot prices.
    ///
    /// Idle cash moves by each order's notional within its own account.
    /// Running the engine again on this state with the same prices and
    /// weights yields no further orders.
    pub fn post_trade_state(&self, state: &PortfolioState) -> Result<PortfolioState> {
        let mut cash: FxHashMap<&str, i64> = state
            .accounts()
            .iter()
            .map(|a| (a.name.as_str(), a.idle_cash.0))
            .collect();
        let mut shares: FxHashMap<(Ticker, String), i64> = state
            .holdings()
            .iter()
            .map(|h| ((h.ticker.clone(), h.account.clone()), h.shares))
            .collect();

        for order in &self.orders {
            if let Some(c) = cash.get_mut(order.account.as_str()) {
                *c += order.cash_delta();
            }
            *shares
                .entry((order.ticker.clone(), order.account.clone()))
                .or_insert(0) += order.signed_shares();
        }

        let accounts: Vec<Account> = state
            .accounts()
            .iter()
            .map(|a| {
                let idle = cash.get(a.name.as_str()).copied().unwrap_or(a.idle_cash.0);
                Account::new(&a.name, a.kind, Price(idle))
            })
            .collect();

        let mut holdings: Vec<Holding> = shares
            .into_iter()
            .filter(|(_, qty)| *qty != 0)
            .map(|((ticker, account), qty)| Holding {
                ticker,
                account,
                shares: qty,
            })
            .collect();
        holdings.sort_by(|a, b| (&a.account, &a.ticker).cmp(&(&b.account, &b.ticker)));

        PortfolioState::build(state.assets().to_vec(), accounts, holdings)
    }

    /// Order counts and gross notional.
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for order in &self.orders {
            match order.action {
                Action::Sell => {
                    summary.sells += 1;
                    summary.sell_notional.0 += order.notional.0;
                }
                Action::Buy => {
                    summary.buys += 1;
                    summary.buy_notional.0 += order.notional.0;
                }
            }
        }
        summary.unallocatable = self.unallocatable.len();
        summary
    }
}

/// Aggregate view of a plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanSummary {
    pub sells: usize,
    pub buys: usize,
    pub sell_notional: Price,
    pub buy_notional: Price,
    pub unallocatable: usize,
}

impl PlanSummary {
    /// Buys minus sells: idle cash the plan consumes overall (cents).
    pub fn net_cash_used(&self) -> i64 {
        self.buy_notional.0 - self.sell_notional.0
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sells ({}), {} buys ({}), net cash used {}",
            self.sells,
            self.sell_notional,
            self.buys,
            self.buy_notional,
            Price(self.net_cash_used()),
        )?;
        if self.unallocatable > 0 {
            write!(f, ", {} unallocatable", self.unallocatable)?;
        }
        Ok(())
    }
}
