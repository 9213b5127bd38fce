//! CLI entry point for the taxfolio rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use taxfolio_rebalancer::config::Config;
use taxfolio_rebalancer::runner::{self, PlanOptions};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Tax-aware multi-account portfolio rebalancer")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute and print the sequenced rebalance orders
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,

        /// Exit with status 2 if any ticker could not be placed
        #[arg(long)]
        strict: bool,
    },

    /// Show current holdings per account
    Holdings,

    /// Compare actual weights against targets
    Drift,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Plan { json, strict } => {
            runner::run_plan(&config, &PlanOptions { json }).map(|outcome| {
                if strict && outcome.unallocatable > 0 {
                    eprintln!(
                        "\n{} ticker(s) could not be placed (--strict)",
                        outcome.unallocatable
                    );
                    process::exit(2);
                }
            })
        }
        Command::Holdings => runner::show_holdings(&config),
        Command::Drift => runner::run_drift(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
