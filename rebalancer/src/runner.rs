//! Run orchestration: load inputs → freeze prices → plan → report.
//!
//! Each command loads the CSV inputs named by the config, prices them once
//! through the file-backed oracle, and prints a report. `plan` also writes
//! the JSONL audit trail.

use std::fmt::Write as _;

use log::{info, warn};
use taxfolio::{
    Order, PortfolioState, Price, PriceSnapshot, RebalancePlan, drift_report,
    rebalance_with_prices,
};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::Result;
use crate::inputs;
use crate::quotes;

/// Options for a `plan` run.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Print the plan as JSON instead of a table
    pub json: bool,
}

/// What a `plan` run produced, for exit-code decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOutcome {
    pub orders: usize,
    pub unallocatable: usize,
}

/// Load the portfolio and freeze prices for every ticker it needs.
pub fn load_inputs(config: &Config) -> Result<(PortfolioState, PriceSnapshot)> {
    let state = inputs::load_state(&config.inputs)?;
    let oracle = quotes::load_quotes(&config.inputs.prices)?;
    let prices = PriceSnapshot::fetch(&oracle, &state.required_tickers())?;
    info!(
        "loaded {} assets, {} accounts, {} holdings, {} prices",
        state.assets().len(),
        state.accounts().len(),
        state.holdings().len(),
        prices.len()
    );
    Ok((state, prices))
}

/// Compute the rebalance plan without printing or auditing it.
pub fn compute_plan(config: &Config) -> Result<(PortfolioState, PriceSnapshot, RebalancePlan)> {
    let engine = config.rebalance_config();
    let (state, prices) = load_inputs(config)?;
    state.check_weight_sum(engine.weight_tolerance);
    let plan = rebalance_with_prices(&state, &prices, &engine)?;
    Ok((state, prices, plan))
}

/// Compute, audit, and print a rebalance plan.
pub fn run_plan(config: &Config, opts: &PlanOptions) -> Result<PlanOutcome> {
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit, "plan", &config.inputs.assets.display().to_string())?;

    let (_, prices, plan) = compute_plan(config)?;
    audit::log_prices(&mut audit, &prices)?;
    audit::log_plan(&mut audit, &plan)?;
    for err in &plan.unallocatable {
        warn!("{err}");
        audit::log_unallocatable(&mut audit, err)?;
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render_plan(&plan));
    }

    audit::log_run_completed(&mut audit, plan.orders.len(), plan.unallocatable.len())?;
    info!("audit logged to {}", config.audit_path().display());

    Ok(PlanOutcome {
        orders: plan.orders.len(),
        unallocatable: plan.unallocatable.len(),
    })
}

/// Show current holdings per account.
pub fn show_holdings(config: &Config) -> Result<()> {
    let (state, prices) = load_inputs(config)?;
    print!("{}", render_holdings(&state, &prices)?);
    Ok(())
}

/// Compare actual weights against targets.
pub fn run_drift(config: &Config) -> Result<()> {
    let (state, prices) = load_inputs(config)?;
    let report = drift_report(&state, &prices)?;
    print!("{report}");
    Ok(())
}

/// Plan as a human-readable table.
pub fn render_plan(plan: &RebalancePlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Portfolio value: {}", plan.total_value);

    if plan.orders.is_empty() {
        let _ = writeln!(out, "\nNo rebalancing needed: portfolio matches target.");
    } else {
        let _ = writeln!(out, "\nREBALANCE ORDERS:");
        let _ = writeln!(
            out,
            "  {:>3}  {:6} {:8} {:12} {:14} {:>8} {:>10} {:>12}",
            "#", "Action", "Ticker", "Account", "Type", "Shares", "Price", "Notional"
        );
        for (i, order) in plan.orders.iter().enumerate() {
            let _ = writeln!(out, "  {:>3}  {}", i + 1, order_row(order));
        }
        let _ = writeln!(out, "\n{}", plan.summary());
    }

    if !plan.unallocatable.is_empty() {
        let _ = writeln!(out, "\nUNALLOCATABLE:");
        for err in &plan.unallocatable {
            let _ = writeln!(out, "  {err} (short {})", err.shortfall());
        }
    }
    out
}

fn order_row(order: &Order) -> String {
    format!(
        "{:6} {:8} {:12} {:14} {:>8} {:>10} {:>12}",
        order.action,
        order.ticker,
        order.account,
        order.kind.to_string(),
        order.shares,
        order.price.to_string(),
        order.notional.to_string(),
    )
}

/// Holdings grouped by account, valued at snapshot prices.
pub fn render_holdings(state: &PortfolioState, prices: &PriceSnapshot) -> Result<String> {
    let mut out = String::new();
    let total = state.total_value(prices)?;

    for account in state.accounts() {
        let value = state.account_value(account, prices)?;
        let _ = writeln!(
            out,
            "{} ({}): {} total, {} idle cash",
            account.name, account.kind, Price(value), account.idle_cash
        );

        let mut rows: Vec<_> = state
            .holdings()
            .iter()
            .filter(|h| h.account == account.name)
            .collect();
        if rows.is_empty() {
            let _ = writeln!(out, "  No positions.");
            continue;
        }
        rows.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        for h in rows {
            let price = prices.price(&h.ticker)?;
            let held = price.value_of(h.quantity());
            let weight = if total > 0 {
                held as f64 / total as f64
            } else {
                0.0
            };
            let _ = writeln!(
                out,
                "  {:8} {:>6} @ {:>10} = {:>12}  ({:.1}%)",
                h.ticker,
                h.shares,
                price.to_string(),
                Price(held).to_string(),
                weight * 100.0,
            );
        }
    }
    let _ = writeln!(out, "\nTotal: {}", Price(total));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxfolio::oracle::StaticQuotes;
    use taxfolio::{Account, Asset, Holding, RebalanceConfig, rebalance};

    fn state() -> PortfolioState {
        PortfolioState::build(
            vec![Asset::new("VTI", 0.10, 0.5), Asset::new("BND", 0.03, 0.5)],
            vec![
                Account::taxable("Taxable", Price(0)),
                Account::tax_advantaged("IRA", Price(2_000_00)),
            ],
            vec![Holding::new("VTI", "Taxable", 80)],
        )
        .unwrap()
    }

    fn quotes() -> StaticQuotes {
        StaticQuotes::new()
            .with_quote("VTI", Price(100_00))
            .with_quote("BND", Price(50_00))
    }

    #[test]
    fn render_plan_lists_orders_in_sequence() {
        let plan = rebalance(&state(), &quotes(), &RebalanceConfig::default()).unwrap();
        let text = render_plan(&plan);
        assert!(text.contains("Portfolio value: $10000.00"));
        let sell = text.find("SELL").unwrap();
        let buy = text.find("BUY").unwrap();
        assert!(sell < buy);
        assert!(text.contains("sells"));
    }

    #[test]
    fn render_plan_empty() {
        let plan = RebalancePlan {
            total_value: Price(0),
            targets: vec![],
            placements: vec![],
            orders: vec![],
            unallocatable: vec![],
        };
        assert!(render_plan(&plan).contains("No rebalancing needed"));
    }

    #[test]
    fn render_holdings_groups_by_account() {
        let prices = PriceSnapshot::fetch(&quotes(), &state().required_tickers()).unwrap();
        let text = render_holdings(&state(), &prices).unwrap();
        assert!(text.contains("Taxable (Taxable)"));
        assert!(text.contains("IRA (Tax-Advantaged)"));
        assert!(text.contains("No positions."));
        assert!(text.contains("(80.0%)"));
    }
}
