//! Execution order sequencer.
//!
//! A pure total order over proposed orders:
//!
//! | Group | Primary | Account kind | Then |
//! |-------|---------|--------------|------|
//! | SELLs first | volatility descending | Taxable before Tax-Advantaged | ticker, account |
//! | BUYs after | volatility ascending | Tax-Advantaged before Taxable | ticker, account |
//!
//! Selling first frees the cash each account's buys depend on.

use std::cmp::Ordering;

use crate::account::AccountKind;
use crate::action::Action;
use crate::orders::Order;

/// Total order used to present and cash-check orders.
pub fn compare(a: &Order, b: &Order) -> Ordering {
    match (a.action, b.action) {
        (Action::Sell, Action::Buy) => Ordering::Less,
        (Action::Buy, Action::Sell) => Ordering::Greater,
        (Action::Sell, Action::Sell) => b
            .volatility
            .total_cmp(&a.volatility)
            .then_with(|| sell_kind_rank(a.kind).cmp(&sell_kind_rank(b.kind))),
        (Action::Buy, Action::Buy) => a
            .volatility
            .total_cmp(&b.volatility)
            .then_with(|| buy_kind_rank(a.kind).cmp(&buy_kind_rank(b.kind))),
    }
    .then_with(|| a.ticker.cmp(&b.ticker))
    .then_with(|| a.account.cmp(&b.account))
}

/// Sort orders in place into execution sequence.
pub fn sort_orders(orders: &mut [Order]) {
    orders.sort_by(compare);
}

/// True if no BUY precedes a SELL.
pub fn sells_first(orders: &[Order]) -> bool {
    orders
        .iter()
        .skip_while(|o| o.action == Action::Sell)
        .all(|o| o.action == Action::Buy)
}

#[inline]
fn sell_kind_rank(kind: AccountKind) -> u8 {
    match kind {
        AccountKind::Taxable => 0,
        AccountKind::TaxAdvantaged => 1,
    }
}

#[inline]
fn buy_kind_rank(kind: AccountKind) -> u8 {
    match kind {
        AccountKind::TaxAdvantaged => 0,
        AccountKind::Taxable => 1,
    }
}
