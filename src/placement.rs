//! Account placement engine.
//!
//! Distributes each ticker's portfolio-wide target across accounts:
//!
//! 1. **Classification**: walking tickers from most to least volatile, a
//!    ticker prefers tax-advantaged accounts while the target value ranked
//!    ahead of it still fits in tax-advantaged capacity; the rest prefer
//!    taxable accounts.
//! 2. **Preservation**: existing holdings are kept up to the target, so a
//!    correctly placed ticker is never sold and rebought. Shares beyond the
//!    target are released and their proceeds stay in the same account.
//! 3. **Greedy fill**: the remaining need is bought into the preferred kind
//!    first (accounts already holding the ticker, then the most cash), and
//!    spills into the other kind once the preferred accounts are out of cash.
//!
//! Cash never moves between accounts. A ticker that cannot be placed within
//! `slack_shares` is reported as [`UnallocatableError`]; the others proceed.

use std::cmp::Ordering;

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::account::AccountKind;
use crate::config::RebalanceConfig;
use crate::error::UnallocatableError;
use crate::state::PortfolioState;
use crate::target::TargetPosition;
use crate::types::{Price, Quantity, Ticker};

/// Target shares of one ticker assigned to one account.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacedTarget {
    pub ticker: Ticker,
    pub account: String,
    pub kind: AccountKind,
    pub shares: Quantity,
}

/// Output of [`place`].
#[derive(Clone, Debug, Default)]
pub struct Placement {
    /// Per-(ticker, account) targets, grouped by ticker in rank order.
    pub placements: Vec<PlacedTarget>,
    /// Preferred account kind chosen for each ticker, in rank order.
    pub preferred: Vec<(Ticker, AccountKind)>,
    /// Tickers whose target could not be placed.
    pub unallocatable: Vec<UnallocatableError>,
}

impl Placement {
    /// Shares of `ticker` placed in `account`.
    pub fn shares(&self, ticker: &Ticker, account: &str) -> Quantity {
        self.placements
            .iter()
            .find(|p| &p.ticker == ticker && p.account == account)
            .map(|p| p.shares)
            .unwrap_or(0)
    }

    /// Shares of `ticker` placed across all accounts.
    pub fn total(&self, ticker: &Ticker) -> Quantity {
        self.placements
            .iter()
            .filter(|p| &p.ticker == ticker)
            .map(|p| p.shares)
            .sum()
    }

    /// Preferred kind for `ticker`, if it was ranked.
    pub fn preferred_kind(&self, ticker: &Ticker) -> Option<AccountKind> {
        self.preferred
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, k)| *k)
    }
}

/// Per-account working state during placement.
struct Slot<'a> {
    name: &'a str,
    kind: AccountKind,
    /// Cash available for buys (cents): idle cash plus released proceeds
    available: i64,
}

/// Preferred account kind per ticker, for `targets` in rank order.
pub fn classify(
    targets: &[TargetPosition],
    tax_advantaged_capacity: i64,
) -> Vec<(Ticker, AccountKind)> {
    let mut cumulative = 0i64;
    targets
        .iter()
        .map(|t| {
            let kind = if cumulative < tax_advantaged_capacity {
                AccountKind::TaxAdvantaged
            } else {
                AccountKind::Taxable
            };
            cumulative += t.price.value_of(t.target_shares);
            (t.ticker.clone(), kind)
        })
        .collect()
}

/// Place every target across the state's accounts.
///
/// `targets` must be in rank order (as returned by [`crate::target::allocate`])
/// and must cover every held ticker, since their prices value the accounts.
pub fn place(
    state: &PortfolioState,
    targets: &[TargetPosition],
    config: &RebalanceConfig,
) -> Placement {
    let by_ticker: FxHashMap<&Ticker, &TargetPosition> =
        targets.iter().map(|t| (&t.ticker, t)).collect();

    let mut slots: Vec<Slot<'_>> = state
        .accounts()
        .iter()
        .map(|a| Slot {
            name: &a.name,
            kind: a.kind,
            available: a.idle_cash.0,
        })
        .collect();

    let tax_advantaged_capacity: i64 = slots
        .iter()
        .filter(|s| s.kind == AccountKind::TaxAdvantaged)
        .map(|s| {
            let held: i64 = state
                .holdings()
                .iter()
                .filter(|h| h.account == s.name)
                .filter_map(|h| by_ticker.get(&h.ticker).map(|t| t.price.value_of(h.quantity())))
                .sum();
            s.available + held
        })
        .sum();

    let preferred = classify(targets, tax_advantaged_capacity);

    // (ticker index, slot index) -> shares
    let mut placed: Vec<Vec<Quantity>> = vec![vec![0; slots.len()]; targets.len()];

    // Preservation: keep what is already held, up to the target.
    for (ti, target) in targets.iter().enumerate() {
        let pref = preferred[ti].1;
        let mut holders: Vec<(usize, Quantity)> = slots
            .iter()
            .enumerate()
            .map(|(si, s)| (si, state.shares(&target.ticker, s.name)))
            .filter(|(_, qty)| *qty > 0)
            .collect();
        holders.sort_by(|a, b| {
            kind_rank(slots[a.0].kind, pref)
                .cmp(&kind_rank(slots[b.0].kind, pref))
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| slots[a.0].name.cmp(slots[b.0].name))
        });

        let mut remaining = target.target_shares;
        for (si, qty) in holders {
            let keep = qty.min(remaining);
            remaining -= keep;
            placed[ti][si] = keep;
            let released = qty - keep;
            if released > 0 {
                slots[si].available += target.price.value_of(released);
                debug!(
                    "{}: release {} shares in {} ({})",
                    target.ticker,
                    released,
                    slots[si].name,
                    Price(target.price.value_of(released))
                );
            }
        }
    }

    // Greedy fill of the remaining need, most volatile ticker first.
    let mut unallocatable = Vec::new();
    for (ti, target) in targets.iter().enumerate() {
        let pref = preferred[ti].1;
        let kept: Quantity = placed[ti].iter().sum();
        let mut need = target.target_shares - kept;

        if need > 0 {
            let mut order: Vec<usize> = (0..slots.len()).collect();
            order.sort_by(|&a, &b| fill_cmp(&slots, &placed[ti], pref, a, b));

            for si in order {
                if need == 0 {
                    break;
                }
                let take = need.min(target.price.affordable(slots[si].available));
                if take == 0 {
                    continue;
                }
                slots[si].available -= target.price.value_of(take);
                placed[ti][si] += take;
                need -= take;
                debug!(
                    "{}: place {} shares in {} ({}, preferred {})",
                    target.ticker, take, slots[si].name, slots[si].kind, pref
                );
            }
        }

        let total: Quantity = placed[ti].iter().sum();
        let shortfall = target.target_shares - total;
        if shortfall > config.slack_shares || (target.target_shares > 0 && total == 0) {
            warn!(
                "{}: only {} of {} target shares fit in available cash",
                target.ticker, total, target.target_shares
            );
            unallocatable.push(UnallocatableError {
                ticker: target.ticker.clone(),
                target_shares: target.target_shares,
                placed_shares: total,
            });
        }
    }

    let mut placements = Vec::new();
    for (ti, target) in targets.iter().enumerate() {
        for (si, slot) in slots.iter().enumerate() {
            let shares = placed[ti][si];
            if shares > 0 {
                placements.push(PlacedTarget {
                    ticker: target.ticker.clone(),
                    account: slot.name.to_string(),
                    kind: slot.kind,
                    shares,
                });
            }
        }
    }

    Placement {
        placements,
        preferred,
        unallocatable,
    }
}

/// 0 for the preferred kind, 1 for the fallback kind.
#[inline]
fn kind_rank(kind: AccountKind, preferred: AccountKind) -> u8 {
    if kind == preferred { 0 } else { 1 }
}

/// Fill order: preferred kind, already holding the ticker, most cash, name.
fn fill_cmp(
    slots: &[Slot<'_>],
    placed: &[Quantity],
    preferred: AccountKind,
    a: usize,
    b: usize,
) -> Ordering {
    let (sa, sb) = (&slots[a], &slots[b]);
    kind_rank(sa.kind, preferred)
        .cmp(&kind_rank(sb.kind, preferred))
        .then_with(|| (placed[b] > 0).cmp(&(placed[a] > 0)))
        .then_with(|| sb.available.cmp(&sa.available))
        .then_with(|| sa.name.cmp(sb.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Account, Holding};
    use crate::asset::Asset;
    use crate::oracle::PriceSnapshot;
    use crate::target::allocate;

    fn t(s: &str) -> Ticker {
        Ticker::from(s)
    }

    fn prices() -> PriceSnapshot {
        PriceSnapshot::from_pairs(&[
            (t("VTI"), Price(100_00)),
            (t("VXUS"), Price(50_00)),
            (t("BND"), Price(80_00)),
            (t("ARKK"), Price(75_00)),
            (t("GLD"), Price(150_00)),
        ])
    }

    fn run(assets: Vec<Asset>, accounts: Vec<Account>, holdings: Vec<Holding>) -> Placement {
        let state = PortfolioState::build(assets, accounts, holdings).unwrap();
        let prices = prices();
        let total = state.total_value(&prices).unwrap();
        let targets = allocate(&state, &prices, total).unwrap();
        place(&state, &targets, &RebalanceConfig::default())
    }

    #[test]
    fn classify_fills_sheltered_capacity_by_volatility() {
        let targets = vec![
            TargetPosition {
                ticker: t("ARKK"),
                volatility: 0.4,
                cash_weight: 0.1,
                price: Price(100_00),
                target_value: 10_000_00,
                target_shares: 100,
            },
            TargetPosition {
                ticker: t("VTI"),
                volatility: 0.1,
                cash_weight: 0.3,
                price: Price(100_00),
                target_value: 30_000_00,
                target_shares: 300,
            },
            TargetPosition {
                ticker: t("BND"),
                volatility: 0.03,
                cash_weight: 0.6,
                price: Price(100_00),
                target_value: 60_000_00,
                target_shares: 600,
            },
        ];
        let kinds: Vec<AccountKind> = classify(&targets, 20_000_00)
            .into_iter()
            .map(|(_, k)| k)
            .collect();
        assert_eq!(
            kinds,
            vec![
                AccountKind::TaxAdvantaged, // 0 ahead < 20k
                AccountKind::TaxAdvantaged, // 10k ahead < 20k
                AccountKind::Taxable,       // 40k ahead
            ]
        );

        let none = classify(&targets, 0);
        assert!(none.iter().all(|(_, k)| *k == AccountKind::Taxable));
    }

    #[test]
    fn volatile_asset_goes_to_tax_advantaged() {
        let p = run(
            vec![
                Asset::new("VTI", 0.1, 0.3),
                Asset::new("ARKK", 0.4, 0.1),
                Asset::new("BND", 0.03, 0.6),
            ],
            vec![
                Account::taxable("Taxable", Price(90_000_00)),
                Account::tax_advantaged("IRA", Price(10_000_00)),
            ],
            vec![],
        );
        // ARKK: $10,000 / $75 = 133 shares, all sheltered
        assert_eq!(p.shares(&t("ARKK"), "IRA"), 133);
        assert_eq!(p.shares(&t("ARKK"), "Taxable"), 0);
        assert_eq!(p.preferred_kind(&t("BND")), Some(AccountKind::Taxable));
        assert_eq!(p.shares(&t("BND"), "Taxable"), 750);
        assert_eq!(p.shares(&t("VTI"), "Taxable"), 300);
        assert!(p.unallocatable.is_empty());
    }

    #[test]
    fn split_across_kinds_when_preferred_runs_out() {
        let p = run(
            vec![Asset::new("VTI", 0.1, 0.8), Asset::new("BND", 0.03, 0.2)],
            vec![
                Account::taxable("Taxable", Price(60_000_00)),
                Account::tax_advantaged("IRA", Price(40_000_00)),
            ],
            vec![],
        );
        assert_eq!(p.shares(&t("VTI"), "IRA"), 400);
        assert_eq!(p.shares(&t("VTI"), "Taxable"), 400);
        assert_eq!(p.shares(&t("BND"), "Taxable"), 250);
        assert_eq!(p.total(&t("VTI")), 800);
    }

    #[test]
    fn split_within_kind_fills_largest_cash_first() {
        let p = run(
            vec![Asset::new("ARKK", 0.4, 1.0)],
            vec![
                Account::tax_advantaged("401k", Price(2_000_00)),
                Account::tax_advantaged("IRA", Price(6_000_00)),
                Account::tax_advantaged("Roth", Price(2_000_00)),
            ],
            vec![],
        );
        // 133 shares: IRA takes 80 ($6,000), then 401k 26 ($1,950), Roth 26
        assert_eq!(p.shares(&t("ARKK"), "IRA"), 80);
        assert_eq!(p.shares(&t("ARKK"), "401k"), 26);
        assert_eq!(p.shares(&t("ARKK"), "Roth"), 26);
        // one share of rounding slack is tolerated
        assert_eq!(p.total(&t("ARKK")), 132);
        assert!(p.unallocatable.is_empty());
    }

    #[test]
    fn existing_placement_is_preserved() {
        // VTI is volatile enough to prefer the IRA, but already sits in the
        // taxable account: keep it there.
        let p = run(
            vec![Asset::new("VTI", 0.1, 0.5), Asset::new("BND", 0.03, 0.5)],
            vec![
                Account::taxable("Taxable", Price(0)),
                Account::tax_advantaged("IRA", Price(10_000_00)),
            ],
            vec![Holding::new("VTI", "Taxable", 100)],
        );
        assert_eq!(p.preferred_kind(&t("VTI")), Some(AccountKind::TaxAdvantaged));
        assert_eq!(p.shares(&t("VTI"), "Taxable"), 100);
        assert_eq!(p.shares(&t("VTI"), "IRA"), 0);
        assert_eq!(p.shares(&t("BND"), "IRA"), 125);
    }

    #[test]
    fn excess_holding_releases_cash_in_same_account() {
        // 200 BND ($16,000) with a $8,000 target: 100 shares released, the
        // proceeds fund VTI in the same account.
        let p = run(
            vec![Asset::new("VTI", 0.1, 0.5), Asset::new("BND", 0.03, 0.5)],
            vec![Account::taxable("Taxable", Price(0))],
            vec![Holding::new("BND", "Taxable", 200)],
        );
        assert_eq!(p.shares(&t("BND"), "Taxable"), 100);
        assert_eq!(p.shares(&t("VTI"), "Taxable"), 80);
    }

    #[test]
    fn unallocatable_when_no_cash_left() {
        // Weights sum to 1.5: VTI (ranked first) takes all the cash.
        let p = run(
            vec![Asset::new("VTI", 0.1, 1.0), Asset::new("BND", 0.03, 0.5)],
            vec![Account::taxable("Taxable", Price(10_000_00))],
            vec![],
        );
        assert_eq!(p.total(&t("VTI")), 100);
        assert_eq!(p.total(&t("BND")), 0);
        assert_eq!(
            p.unallocatable,
            vec![UnallocatableError {
                ticker: t("BND"),
                target_shares: 62,
                placed_shares: 0,
            }]
        );
    }

    #[test]
    fn liquidation_places_nothing() {
        let p = run(
            vec![Asset::new("VTI", 0.1, 1.0)],
            vec![Account::taxable("Taxable", Price(1_000_00))],
            vec![
                Holding::new("VTI", "Taxable", 50),
                Holding::new("VXUS", "Taxable", 30),
            ],
        );
        assert_eq!(p.total(&t("VXUS")), 0);
        // $1,000 + $5,000 + $1,500 = $7,500 -> 75 VTI
        assert_eq!(p.total(&t("VTI")), 75);
        assert!(p.unallocatable.is_empty());
    }
}
