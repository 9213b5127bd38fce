//! Delta & order generator.
//!
//! Diffs placed targets against current holdings per (ticker, account),
//! drops drifts below the no-trade threshold, and keeps every account's buys
//! within its idle cash plus the proceeds of its own sells.

use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::account::AccountKind;
use crate::action::Action;
use crate::config::RebalanceConfig;
use crate::placement::Placement;
use crate::sequence;
use crate::state::PortfolioState;
use crate::target::TargetPosition;
use crate::types::{Price, Quantity, Ticker};

/// A proposed trade. The engine never executes it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Order {
    pub ticker: Ticker,
    pub account: String,
    pub kind: AccountKind,
    pub action: Action,
    pub shares: Quantity,
    /// Snapshot price per share
    pub price: Price,
    /// `shares × price`
    pub notional: Price,
    pub volatility: f64,
}

impl Order {
    /// Signed share change this order applies to its (ticker, account).
    #[inline]
    pub fn signed_shares(&self) -> i64 {
        self.action.sign() * self.shares as i64
    }

    /// Signed cash change for the account: sells add, buys spend.
    #[inline]
    pub fn cash_delta(&self) -> i64 {
        -self.action.sign() * self.notional.0
    }
}

/// Generate sequenced orders moving `state` to `placement`.
///
/// Every (ticker, account) pair that is held or placed is considered. Pairs
/// whose drift is worth less than `threshold_fraction` of the ticker's target
/// value are skipped, except liquidations (ticker target of zero shares),
/// which always trade. Sells never exceed the shares held.
///
/// After sequencing, each account's buys are checked against its idle cash
/// plus sell proceeds; a buy that no longer fits is clipped to what the
/// remaining cash affords, or dropped if that leaves nothing worth trading.
pub fn generate(
    state: &PortfolioState,
    targets: &[TargetPosition],
    placement: &Placement,
    config: &RebalanceConfig,
) -> Vec<Order> {
    let by_ticker: FxHashMap<&Ticker, &TargetPosition> =
        targets.iter().map(|t| (&t.ticker, t)).collect();

    let mut pairs: Vec<(Ticker, String)> = Vec::new();
    let mut seen: FxHashSet<(Ticker, String)> = FxHashSet::default();
    let held = state.holdings().iter().map(|h| (&h.ticker, &h.account));
    let placed = placement.placements.iter().map(|p| (&p.ticker, &p.account));
    for (ticker, account) in held.chain(placed) {
        let key = (ticker.clone(), account.clone());
        if seen.insert(key.clone()) {
            pairs.push(key);
        }
    }

    let mut orders = Vec::new();
    for (ticker, account) in pairs {
        // Every held or placed ticker has a target when `targets` comes
        // from `allocate`.
        let Some(target) = by_ticker.get(&ticker) else {
            continue;
        };
        let Some(kind) = state.account_kind(&account) else {
            continue;
        };

        let current = state.shares(&ticker, &account) as i64;
        let wanted = placement.shares(&ticker, &account) as i64;
        let delta = wanted - current;
        let Some(action) = Action::for_delta(delta) else {
            continue;
        };

        let shares = delta.unsigned_abs();
        let delta_value = target.price.value_of(shares);
        if !target.is_liquidation() && below_threshold(delta_value, target, config) {
            debug!(
                "{ticker}@{account}: skip {action} {shares} ({} below threshold)",
                Price(delta_value)
            );
            continue;
        }

        orders.push(Order {
            ticker,
            account,
            kind,
            action,
            shares,
            price: target.price,
            notional: Price(delta_value),
            volatility: target.volatility,
        });
    }

    sequence::sort_orders(&mut orders);
    enforce_cash(state, orders, &by_ticker, config)
}

/// Drift worth less than the threshold share of the ticker's target value.
#[inline]
fn below_threshold(delta_value: i64, target: &TargetPosition, config: &RebalanceConfig) -> bool {
    (delta_value as f64) < config.threshold_fraction * target.target_value as f64
}

/// Clip or drop buys that exceed their account's cash. `orders` must be
/// sequenced (sells first).
fn enforce_cash(
    state: &PortfolioState,
    orders: Vec<Order>,
    by_ticker: &FxHashMap<&Ticker, &TargetPosition>,
    config: &RebalanceConfig,
) -> Vec<Order> {
    let mut cash: FxHashMap<&str, i64> = state
        .accounts()
        .iter()
        .map(|a| (a.name.as_str(), a.idle_cash.0))
        .collect();
    for order in orders.iter().filter(|o| o.action == Action::Sell) {
        if let Some(c) = cash.get_mut(order.account.as_str()) {
            *c += order.notional.0;
        }
    }

    let mut kept = Vec::with_capacity(orders.len());
    for mut order in orders {
        if order.action == Action::Sell {
            kept.push(order);
            continue;
        }

        let Some(available) = cash.get_mut(order.account.as_str()) else {
            continue;
        };
        if order.notional.0 > *available {
            let fits = order.price.affordable(*available);
            let clipped_value = order.price.value_of(fits);
            let too_small = by_ticker
                .get(&order.ticker)
                .is_some_and(|t| below_threshold(clipped_value, t, config));
            if fits == 0 || too_small {
                warn!(
                    "{}@{}: drop BUY {} ({} needed, {} available)",
                    order.ticker,
                    order.account,
                    order.shares,
                    order.notional,
                    Price(*available)
                );
                continue;
            }
            warn!(
                "{}@{}: clip BUY {} -> {} to fit {} cash",
                order.ticker,
                order.account,
                order.shares,
                fits,
                Price(*available)
            );
            order.shares = fits;
            order.notional = Price(clipped_value);
        }
        *available -= order.notional.0;
        kept.push(order);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Account, Holding};
    use crate::asset::Asset;
    use crate::oracle::PriceSnapshot;
    use crate::placement::{PlacedTarget, place};
    use crate::target::allocate;

    fn t(s: &str) -> Ticker {
        Ticker::from(s)
    }

    fn prices() -> PriceSnapshot {
        PriceSnapshot::from_pairs(&[
            (t("VTI"), Price(100_00)),
            (t("VXUS"), Price(50_00)),
            (t("BND"), Price(80_00)),
        ])
    }

    fn plan(state: &PortfolioState, config: &RebalanceConfig) -> Vec<Order> {
        let prices = prices();
        let total = state.total_value(&prices).unwrap();
        let targets = allocate(state, &prices, total).unwrap();
        let placement = place(state, &targets, config);
        generate(state, &targets, &placement, config)
    }

    #[test]
    fn fresh_portfolio_buys_everything() {
        let state = PortfolioState::build(
            vec![Asset::new("VTI", 0.1, 0.6), Asset::new("VXUS", 0.12, 0.4)],
            vec![Account::taxable("Taxable", Price(10_000_00))],
            vec![],
        )
        .unwrap();
        let orders = plan(&state, &RebalanceConfig::default());
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.action == Action::Buy));
        // lower volatility buys first
        assert_eq!(orders[0].ticker, t("VTI"));
        assert_eq!(orders[0].shares, 60);
        assert_eq!(orders[1].ticker, t("VXUS"));
        assert_eq!(orders[1].shares, 80);
    }

    #[test]
    fn small_drift_is_suppressed() {
        // VTI target 60 shares ($6,000); holding 58 is $200 off, under the
        // $300 threshold.
        let state = PortfolioState::build(
            vec![Asset::new("VTI", 0.1, 0.6), Asset::new("BND", 0.03, 0.4)],
            vec![Account::taxable("Taxable", Price(4_200_00))],
            vec![Holding::new("VTI", "Taxable", 58)],
        )
        .unwrap();
        let orders = plan(&state, &RebalanceConfig::default());
        assert!(orders.iter().all(|o| o.ticker != t("VTI")));
        assert!(orders.iter().any(|o| o.ticker == t("BND")));

        let orders = plan(&state, &RebalanceConfig::with_threshold(0.0));
        let vti = orders.iter().find(|o| o.ticker == t("VTI")).unwrap();
        assert_eq!((vti.action, vti.shares), (Action::Buy, 2));
    }

    #[test]
    fn liquidation_ignores_threshold() {
        // One share of an unweighted ticker is tiny but must still be sold.
        let state = PortfolioState::build(
            vec![Asset::new("VTI", 0.1, 1.0)],
            vec![Account::taxable("Taxable", Price(100_000_00))],
            vec![Holding::new("VXUS", "Taxable", 1)],
        )
        .unwrap();
        let orders = plan(&state, &RebalanceConfig::with_threshold(0.5));
        assert_eq!(orders[0].ticker, t("VXUS"));
        assert_eq!(orders[0].action, Action::Sell);
        assert_eq!(orders[0].shares, 1);
    }

    #[test]
    fn sell_never_exceeds_holding() {
        let state = PortfolioState::build(
            vec![Asset::new("VTI", 0.1, 0.2)],
            vec![Account::taxable("Taxable", Price(0))],
            vec![Holding::new("VTI", "Taxable", 100)],
        )
        .unwrap();
        let orders = plan(&state, &RebalanceConfig::default());
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].action, Action::Sell);
        assert_eq!(orders[0].shares, 80);
        assert!(orders[0].shares <= state.shares(&t("VTI"), "Taxable"));
    }

    #[test]
    fn buys_clipped_to_account_cash() {
        // Hand-built placement asking for more than the account can pay.
        let state = PortfolioState::build(
            vec![Asset::new("VTI", 0.1, 1.0)],
            vec![Account::taxable("Taxable", Price(5_050_00))],
            vec![],
        )
        .unwrap();
        let prices = prices();
        let targets = allocate(&state, &prices, 10_000_00).unwrap();
        let placement = Placement {
            placements: vec![PlacedTarget {
                ticker: t("VTI"),
                account: "Taxable".into(),
                kind: AccountKind::Taxable,
                shares: 100,
            }],
            ..Placement::default()
        };
        let orders = generate(&state, &targets, &placement, &RebalanceConfig::default());
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].shares, 50);
        assert_eq!(orders[0].notional, Price(5_000_00));
    }

    #[test]
    fn order_cash_and_share_deltas() {
        let order = Order {
            ticker: t("VTI"),
            account: "Taxable".into(),
            kind: AccountKind::Taxable,
            action: Action::Sell,
            shares: 3,
            price: Price(100_00),
            notional: Price(300_00),
            volatility: 0.1,
        };
        assert_eq!(order.signed_shares(), -3);
        assert_eq!(order.cash_delta(), 300_00);
    }
}
