//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use taxfolio::{PriceSnapshot, RebalancePlan, UnallocatableError};

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// Convenience: log a run start event.
pub fn log_run_started(audit: &mut AuditLog, command: &str, assets_file: &str) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "command": command,
            "assets_file": assets_file,
        }),
    )
}

/// Convenience: log the frozen price snapshot.
pub fn log_prices(audit: &mut AuditLog, prices: &PriceSnapshot) -> Result<()> {
    let price_data: Vec<_> = prices
        .sorted_pairs()
        .iter()
        .map(|(ticker, price)| {
            serde_json::json!({
                "ticker": ticker.as_str(),
                "price": price.as_dollars(),
            })
        })
        .collect();

    audit.log("prices_frozen", serde_json::json!({ "prices": price_data }))
}

/// Convenience: log the computed plan.
pub fn log_plan(audit: &mut AuditLog, plan: &RebalancePlan) -> Result<()> {
    let order_data: Vec<_> = plan
        .orders
        .iter()
        .map(|o| {
            serde_json::json!({
                "ticker": o.ticker.as_str(),
                "account": o.account,
                "action": o.action.to_string(),
                "shares": o.shares,
                "price": o.price.as_dollars(),
                "notional": o.notional.as_dollars(),
            })
        })
        .collect();

    audit.log(
        "plan_computed",
        serde_json::json!({
            "total_value": plan.total_value.as_dollars(),
            "orders": order_data,
        }),
    )
}

/// Convenience: log one unallocatable ticker.
pub fn log_unallocatable(audit: &mut AuditLog, err: &UnallocatableError) -> Result<()> {
    audit.log(
        "unallocatable",
        serde_json::json!({
            "ticker": err.ticker.as_str(),
            "target_shares": err.target_shares,
            "placed_shares": err.placed_shares,
        }),
    )
}

/// Convenience: log run completion.
pub fn log_run_completed(audit: &mut AuditLog, orders: usize, unallocatable: usize) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "orders": orders,
            "unallocatable": unallocatable,
        }),
    )
}
